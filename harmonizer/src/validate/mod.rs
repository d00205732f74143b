//! Ingest YAML validation.
//!
//! Finds the YAML files that live under an ingest directory and checks that
//! each one parses. Parse failures are collected per file, never fatal.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::ValidationError;

pub const DEFAULT_ROOT: &str = "./priority_variables_transform";

/// Which files count as ingest files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestFilter {
    /// Substring some path component must contain
    pub marker: String,
    pub extension: String,
}

impl Default for IngestFilter {
    fn default() -> Self {
        Self {
            marker: "-ingest".to_string(),
            extension: "yaml".to_string(),
        }
    }
}

impl IngestFilter {
    pub fn matches(&self, path: &Path) -> bool {
        let extension_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| e == self.extension);

        extension_ok
            && path
                .components()
                .any(|c| c.as_os_str().to_string_lossy().contains(&self.marker))
    }
}

/// Ingest files under `root`, sorted. A missing root has no files.
pub fn discover_ingest_files(root: &Path, filter: &IngestFilter) -> Result<Vec<PathBuf>, ValidationError> {
    if !root.exists() {
        tracing::warn!(root = %root.display(), "validation root does not exist");
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(ValidationError::Walk {
                    root: root.to_path_buf(),
                    message: e.to_string(),
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if entry.file_type().is_file() && filter.matches(entry.path()) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Valid,
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileValidation {
    pub path: PathBuf,
    pub outcome: Outcome,
}

impl fmt::Display for FileValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::Valid => write!(f, "✅ {} is valid", self.path.display()),
            Outcome::Invalid(reason) => {
                write!(f, "❌ {} is invalid: {}", self.path.display(), reason)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationSummary {
    pub files: Vec<FileValidation>,
}

impl ValidationSummary {
    pub fn total(&self) -> usize {
        self.files.len()
    }

    pub fn valid(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.outcome == Outcome::Valid)
            .count()
    }

    /// 0 when every file is valid, 1 when any is invalid, 2 when there were none.
    pub fn exit_code(&self) -> i32 {
        if self.files.is_empty() {
            2
        } else if self.valid() == self.total() {
            0
        } else {
            1
        }
    }

    /// One line per file, then the `<valid>/<total> files valid` tally.
    pub fn report_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.files.iter().map(ToString::to_string).collect();
        lines.push(format!("{}/{} files valid", self.valid(), self.total()));
        lines
    }
}

/// Parse one file as YAML.
pub fn validate_file(path: &Path) -> Outcome {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => return Outcome::Invalid(e.to_string()),
    };
    match serde_yaml::from_str::<serde_yaml::Value>(&content) {
        Ok(_) => Outcome::Valid,
        Err(e) => Outcome::Invalid(e.to_string()),
    }
}

pub fn validate_files(files: &[PathBuf]) -> ValidationSummary {
    ValidationSummary {
        files: files
            .iter()
            .map(|path| FileValidation {
                path: path.clone(),
                outcome: validate_file(path),
            })
            .collect(),
    }
}
