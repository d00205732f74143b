//! Directory-at-a-time priority-variable transforms.

use std::fs;
use std::path::{Path, PathBuf};

use super::{transform_priority_file, DeriveOptions};
use crate::error::{TransformError, TransformResult};
use crate::ingest::looks_like_priority_file;

/// What happened to each file of a batch.
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Files found in the input directory
    pub found: usize,
    pub transformed: Vec<(PathBuf, PathBuf)>,
    /// Files without the priority-variable marker
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, TransformError)>,
}

impl BatchSummary {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// `*.yaml` and `*.yml` files directly inside `dir`, sorted.
pub fn yaml_files_in(dir: &Path) -> TransformResult<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .map_or(false, |e| e == "yaml" || e == "yml")
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Transform every mapping file in `input_dir` into `output_dir`.
///
/// The output directory is created if needed and each file keeps its name.
/// A file that fails is recorded in the summary and the batch continues.
pub fn transform_directory(
    input_dir: &Path,
    output_dir: &Path,
    options: &DeriveOptions,
) -> TransformResult<BatchSummary> {
    if !input_dir.is_dir() {
        return Err(TransformError::NotADirectory(input_dir.to_path_buf()));
    }
    fs::create_dir_all(output_dir)?;

    let files = yaml_files_in(input_dir)?;
    let mut summary = BatchSummary {
        found: files.len(),
        ..BatchSummary::default()
    };

    for input in files {
        let content = match fs::read_to_string(&input) {
            Ok(content) => content,
            Err(e) => {
                tracing::error!(file = %input.display(), error = %e, "failed to read file");
                summary.failed.push((input, e.into()));
                continue;
            }
        };

        if !looks_like_priority_file(&content) {
            tracing::debug!(file = %input.display(), "not a priority-variable file");
            summary.skipped.push(input);
            continue;
        }

        let output = match input.file_name() {
            Some(name) => output_dir.join(name),
            None => continue,
        };
        let written = transform_priority_file(&content, options)
            .and_then(|yaml| fs::write(&output, yaml).map_err(TransformError::from));
        match written {
            Ok(()) => summary.transformed.push((input, output)),
            Err(e) => {
                tracing::error!(file = %input.display(), error = %e, "failed to transform file");
                summary.failed.push((input, e));
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "priority_variable:\nphv: phv1\ninput_data_type: integer\nvalue:\nMeasurementObservation:\n  unit: cm\n";

    #[test]
    fn test_transform_directory() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("source");
        fs::create_dir(&input).unwrap();
        fs::write(input.join("height.yaml"), SOURCE).unwrap();
        fs::write(input.join("weight.yml"), SOURCE).unwrap();
        fs::write(input.join("done.yaml"), "class_derivations:\n").unwrap();
        fs::write(input.join("notes.txt"), SOURCE).unwrap();

        let output = input.join("transformed");
        let summary = transform_directory(&input, &output, &DeriveOptions::default()).unwrap();

        assert_eq!(summary.found, 3);
        assert_eq!(summary.transformed.len(), 2);
        assert_eq!(summary.skipped, vec![input.join("done.yaml")]);
        assert!(!summary.has_failures());

        let written = fs::read_to_string(output.join("height.yaml")).unwrap();
        let value: serde_yaml::Value = serde_yaml::from_str(&written).unwrap();
        assert_eq!(
            value["class_derivations"]["MeasurementObservation"]["slot_derivations"]["value_decimal"]
                ["populated_from"]
                .as_str(),
            Some("phv1")
        );
    }

    #[test]
    fn test_input_must_be_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.yaml");
        fs::write(&file, SOURCE).unwrap();

        assert!(matches!(
            transform_directory(&file, dir.path(), &DeriveOptions::default()),
            Err(TransformError::NotADirectory(_))
        ));
    }
}
