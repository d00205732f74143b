//! Condition transformer: one `Condition` derivation per raw variable,
//! joined to participant and visit columns through a CSV lookup table.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use harmonizer::derive::{ConditionTransformer, DeriveOptions, VisitLookup};
//!
//! let lookup = VisitLookup::load("contextual_variables.csv")?;
//! let transformer = ConditionTransformer::new(lookup, DeriveOptions::default());
//! let run = transformer.transform_file("asthma.yaml".as_ref(), "asthma_transformed.yaml".as_ref())?;
//! ```

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use super::status::{special_visit_note, status_value_mappings};
use super::templates::strip_comment;
use super::DeriveOptions;
use crate::error::{TableResult, TransformError, TransformResult};
use crate::ingest::{parse_priority_variables, remove_empty_fields, ClassKind, RawVariable};
use crate::table::{load_csv, Table};

pub const DEFAULT_CONCEPT: &str = "MONDO:0004979";
pub const DEFAULT_CONCEPT_COMMENT: &str = "asthma";
pub const DEFAULT_PROVENANCE: &str = "PATIENT_SELF-REPORTED_CONDITION";

const PHT_COLUMN: &str = "data table pht";
const PARTICIPANT_COLUMN: &str = "participant ID phv";
const VISIT_COLUMN: &str = "associated visit";

// =============================================================================
// Visit lookup
// =============================================================================

/// Participant and visit columns of a data table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitInfo {
    pub participant_phv: String,
    pub visit: String,
}

/// `pht` -> participant/visit rows from the contextual-variables CSV.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitLookup {
    rows: Vec<(String, VisitInfo)>,
}

impl VisitLookup {
    pub fn load<P: AsRef<Path>>(path: P) -> TableResult<Self> {
        Self::from_table(&load_csv(path)?)
    }

    pub fn from_table(table: &Table) -> TableResult<Self> {
        let pht = table.require_column(PHT_COLUMN)?;
        let participant = table.require_column(PARTICIPANT_COLUMN)?;
        let visit = table.require_column(VISIT_COLUMN)?;

        let rows = table
            .rows()
            .map(|row| {
                (
                    row[pht].trim().to_string(),
                    VisitInfo {
                        participant_phv: row[participant].trim().to_string(),
                        visit: row[visit].trim().to_string(),
                    },
                )
            })
            .collect();
        Ok(Self { rows })
    }

    /// First row for `pht`; rows with an empty participant or visit do not count.
    pub fn get(&self, pht: &str) -> Option<&VisitInfo> {
        self.rows
            .iter()
            .find(|(key, _)| key == pht)
            .map(|(_, info)| info)
            .filter(|info| !info.participant_phv.is_empty() && !info.visit.is_empty())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// =============================================================================
// Output document
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopulatedFrom {
    pub populated_from: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Expr {
    pub expr: String,
}

impl Expr {
    fn new(expr: impl Into<String>) -> Self {
        Self { expr: expr.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMapping {
    pub populated_from: String,
    pub value_mappings: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConditionSlots {
    pub associated_participant: PopulatedFrom,
    pub associated_visit: Expr,
    pub condition_concept: Expr,
    pub condition_status: StatusMapping,
    pub condition_provenance: Expr,
    pub relationship_to_participant: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConditionDerivation {
    pub populated_from: String,
    pub slot_derivations: ConditionSlots,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConditionClass {
    #[serde(rename = "Condition")]
    pub condition: ConditionDerivation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConditionDocument {
    pub class_derivations: ConditionClass,
}

/// One transformed raw variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionTransform {
    pub document: ConditionDocument,
    /// Written as a `# SPECIAL_VISIT_LOGIC:` comment above the document
    pub special_visit: Option<String>,
}

impl ConditionTransform {
    fn slots(&self) -> &ConditionSlots {
        &self.document.class_derivations.condition.slot_derivations
    }

    pub fn concept(&self) -> &str {
        &self.slots().condition_concept.expr
    }

    pub fn provenance(&self) -> &str {
        &self.slots().condition_provenance.expr
    }

    pub fn to_yaml(&self) -> TransformResult<String> {
        let mut out = String::new();
        if let Some(note) = &self.special_visit {
            let _ = writeln!(out, "# SPECIAL_VISIT_LOGIC: {}", note);
        }
        out.push_str(&serde_yaml::to_string(&self.document)?);
        Ok(out)
    }
}

/// Documents separated by one blank line.
pub fn render_documents(transforms: &[ConditionTransform]) -> TransformResult<String> {
    let docs = transforms
        .iter()
        .map(ConditionTransform::to_yaml)
        .collect::<TransformResult<Vec<_>>>()?;
    Ok(docs.join("\n"))
}

// =============================================================================
// Transformer
// =============================================================================

/// Result of transforming one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionRun {
    pub input: PathBuf,
    pub output: PathBuf,
    pub summary: PathBuf,
    pub transformed: usize,
}

#[derive(Debug, Clone)]
pub struct ConditionTransformer {
    lookup: VisitLookup,
    options: DeriveOptions,
}

impl ConditionTransformer {
    pub fn new(lookup: VisitLookup, options: DeriveOptions) -> Self {
        Self { lookup, options }
    }

    /// Transform a raw variable that carries at least one Condition class.
    ///
    /// Returns `None` (with a warning) when its `pht` has no visit row.
    pub fn transform_raw_variable(&self, raw: &RawVariable) -> Option<ConditionTransform> {
        let pht = raw.identifiers.pht.as_deref().unwrap_or("");
        let info = match self.lookup.get(pht) {
            Some(info) => info,
            None => {
                tracing::warn!(phv = %raw.phv, pht, "could not find visit info for pht");
                return None;
            }
        };

        let slots = ConditionSlots {
            associated_participant: PopulatedFrom {
                populated_from: info.participant_phv.clone(),
            },
            associated_visit: Expr::new(info.visit.clone()),
            condition_concept: Expr::new(concept_expression(raw)),
            condition_status: StatusMapping {
                populated_from: raw.phv.clone(),
                value_mappings: status_value_mappings(raw),
            },
            condition_provenance: Expr::new(provenance(raw)),
            relationship_to_participant: Expr::new("ONESELF"),
        };

        Some(ConditionTransform {
            document: ConditionDocument {
                class_derivations: ConditionClass {
                    condition: ConditionDerivation {
                        populated_from: self.options.cohort.clone(),
                        slot_derivations: slots,
                    },
                },
            },
            special_visit: special_visit_note(&raw.value_sets).map(String::from),
        })
    }

    /// Clean, parse and transform file content.
    pub fn transform_text(&self, text: &str) -> Vec<ConditionTransform> {
        let parsed = parse_priority_variables(&remove_empty_fields(text));

        parsed
            .raw_variables()
            .filter(|raw| !raw.phv.is_empty())
            .filter(|raw| raw.classes_of(ClassKind::Condition).next().is_some())
            .filter_map(|raw| self.transform_raw_variable(raw))
            .collect()
    }

    /// Transform `input` into `output` and write `<output>_summary.txt`.
    pub fn transform_file(&self, input: &Path, output: &Path) -> TransformResult<ConditionRun> {
        if !input.exists() {
            return Err(TransformError::MissingInput(input.to_path_buf()));
        }
        let text = fs::read_to_string(input)?;
        let transforms = self.transform_text(&text);

        fs::write(output, render_documents(&transforms)?)?;
        let summary = summary_path(output);
        fs::write(&summary, summary_report(&transforms))?;

        tracing::info!(
            input = %input.display(),
            output = %output.display(),
            transformed = transforms.len(),
            "transformed condition file"
        );
        Ok(ConditionRun {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            summary,
            transformed: transforms.len(),
        })
    }

    /// Transform several files into `output_dir` as `<stem>_transformed.yaml`.
    ///
    /// Each file is independent; a failure is recorded and the rest continue.
    pub fn transform_batch(
        &self,
        inputs: &[PathBuf],
        output_dir: &Path,
    ) -> TransformResult<Vec<Result<ConditionRun, (PathBuf, TransformError)>>> {
        fs::create_dir_all(output_dir)?;

        Ok(inputs
            .iter()
            .map(|input| {
                let output = output_dir.join(batch_output_name(input));
                self.transform_file(input, &output)
                    .map_err(|e| (input.clone(), e))
            })
            .collect())
    }
}

/// First Condition concept with its comment re-attached, or the default.
fn concept_expression(raw: &RawVariable) -> String {
    let concept = raw
        .classes_of(ClassKind::Condition)
        .find_map(|c| c.scalar("condition_concept"));

    match concept {
        Some(line) => match line.split_once('#') {
            Some((_, comment)) => format!("{}   #{}", strip_comment(line), comment.trim()),
            None => line.trim().to_string(),
        },
        None => format!("{}   #{}", DEFAULT_CONCEPT, DEFAULT_CONCEPT_COMMENT),
    }
}

fn provenance(raw: &RawVariable) -> String {
    raw.classes_of(ClassKind::Condition)
        .find_map(|c| c.scalar("condition_provenance"))
        .unwrap_or(DEFAULT_PROVENANCE)
        .to_string()
}

fn batch_output_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{stem}_transformed.yaml")
}

/// `<output>_summary.txt` next to the output file.
pub fn summary_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push("_summary.txt");
    PathBuf::from(name)
}

pub fn summary_report(transforms: &[ConditionTransform]) -> String {
    let mut concepts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut provenances: BTreeMap<&str, usize> = BTreeMap::new();
    for t in transforms {
        *concepts.entry(t.concept()).or_default() += 1;
        *provenances.entry(t.provenance()).or_default() += 1;
    }
    let special = transforms.iter().filter(|t| t.special_visit.is_some()).count();

    let mut out = String::new();
    out.push_str("YAML Transformation Summary Report\n");
    let _ = writeln!(out, "{}\n", "=".repeat(50));
    let _ = writeln!(out, "Total transformations: {}\n", transforms.len());

    out.push_str("Condition Concepts:\n");
    for (concept, count) in &concepts {
        let _ = writeln!(out, "  {}: {}", concept, count);
    }
    out.push_str("\nCondition Provenances:\n");
    for (provenance, count) in &provenances {
        let _ = writeln!(out, "  {}: {}", provenance, count);
    }

    let _ = writeln!(out, "\nTransformations with special visit logic: {}", special);
    if special > 0 {
        out.push_str("\nNote: Variables with special visit logic may need manual review\n");
        out.push_str("for proper age_at_condition_start and age_at_condition_end calculations.\n");
    }
    out
}
