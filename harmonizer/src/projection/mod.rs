//! Column projection: select, rename and transform source columns into a
//! target schema.
//!
//! ## Usage Flow
//!
//! ```text
//! sheet Table → Projection::apply → target Table (allow-listed rows only) → render
//! ```
//!
//! Projection is a pure function of the source table, so running it twice
//! on the same input yields identical tables.

pub mod operations;

pub use operations::ColumnTransform;

use serde::{Deserialize, Serialize};

use crate::error::{ProjectionError, ProjectionResult};
use crate::table::Table;

/// One output column: where it comes from and how it is transformed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRule {
    /// Source column name
    pub source: String,
    /// Transform applied to each cell
    #[serde(default = "default_transform")]
    pub transform: ColumnTransform,
    /// Target column name
    pub target: String,
}

fn default_transform() -> ColumnTransform {
    ColumnTransform::Copy
}

impl ColumnRule {
    pub fn new(source: &str, transform: ColumnTransform, target: &str) -> Self {
        Self {
            source: source.to_string(),
            transform,
            target: target.to_string(),
        }
    }

    pub fn copy(source: &str, target: &str) -> Self {
        Self::new(source, ColumnTransform::Copy, target)
    }
}

/// Keep only rows whose projected key is one of `allowed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowList {
    /// Target column holding the categorical key
    pub key: String,
    pub allowed: Vec<String>,
}

/// An ordered set of column rules plus an optional row filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    pub rules: Vec<ColumnRule>,
    #[serde(default)]
    pub filter: Option<AllowList>,
}

impl Projection {
    pub fn new(rules: Vec<ColumnRule>) -> Self {
        Self {
            rules,
            filter: None,
        }
    }

    /// Drop projected rows whose `key` column is not in `allowed`.
    pub fn with_allow_list<S: Into<String>>(mut self, key: &str, allowed: impl IntoIterator<Item = S>) -> Self {
        self.filter = Some(AllowList {
            key: key.to_string(),
            allowed: allowed.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Target column names in output order.
    pub fn targets(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.target.clone()).collect()
    }

    /// Project `table` into exactly the target columns, in rule order.
    ///
    /// Filtering happens after projection, on the transformed key.
    pub fn apply(&self, table: &Table) -> ProjectionResult<Table> {
        let indices = self
            .rules
            .iter()
            .map(|rule| {
                table
                    .column_index(&rule.source)
                    .ok_or_else(|| ProjectionError::MissingColumn(rule.source.clone()))
            })
            .collect::<ProjectionResult<Vec<usize>>>()?;

        let key_index = match &self.filter {
            Some(filter) => Some(
                self.rules
                    .iter()
                    .position(|r| r.target == filter.key)
                    .ok_or_else(|| ProjectionError::UnknownKey(filter.key.clone()))?,
            ),
            None => None,
        };

        let mut rows = Vec::with_capacity(table.len());
        for row in table.rows() {
            let projected: Vec<String> = self
                .rules
                .iter()
                .zip(&indices)
                .map(|(rule, &i)| rule.transform.apply(&row[i]))
                .collect();

            if let (Some(filter), Some(k)) = (&self.filter, key_index) {
                if !filter.allowed.iter().any(|a| a == &projected[k]) {
                    continue;
                }
            }
            rows.push(projected);
        }

        tracing::debug!(
            source_rows = table.len(),
            projected_rows = rows.len(),
            "projected table"
        );
        Ok(Table::new(self.targets(), rows))
    }
}

// =============================================================================
// Variable documentation projection
// =============================================================================

/// Target column names of the variable documentation projection.
pub mod doc_columns {
    pub const ELEMENT: &str = "BDCHM element";
    pub const LABEL: &str = "variable label";
    pub const MACHINE_NAME: &str = "machine-readable label";
    pub const DATATYPE: &str = "datatype";
    pub const UNIT: &str = "unit";
    pub const OMOP_CURIE: &str = "OMOP concept id as CURIE";
    pub const OMOP_UCUM_CURIE: &str = "OMOP UCUM id as CURIE";
    pub const OBA_CURIE: &str = "OBA CURIE";
    pub const UCUM_UNIT: &str = "UCUM unit";
    pub const DEFINITION: &str = "Text definition";
}

/// BDCHM classes documented on the variable page.
pub const DOCUMENTED_ELEMENTS: [&str; 3] = ["MeasurementObservation", "Demography", "SdohObservation"];

/// Projection from the "BDCHM Harmonized Variables" worksheet to the
/// documentation schema.
pub fn variable_documentation_projection() -> Projection {
    use doc_columns::*;

    Projection::new(vec![
        ColumnRule::new(
            "BDCHM.Element.Attribute",
            ColumnTransform::FirstSegment {
                delimiter: ".".into(),
            },
            ELEMENT,
        ),
        ColumnRule::copy("Variable (Label)", LABEL),
        ColumnRule::copy("Variable (Machine Readable Name)", MACHINE_NAME),
        ColumnRule::copy("Standardized Data Type", DATATYPE),
        ColumnRule::copy("Standardized Unit", UNIT),
        ColumnRule::new(
            "OMOP Standard Concept ID",
            ColumnTransform::NumericPrefix {
                namespace: "OMOP:".into(),
            },
            OMOP_CURIE,
        ),
        ColumnRule::copy("OMOP UCUM CURIE", OMOP_UCUM_CURIE),
        ColumnRule::copy("OBA CURIE", OBA_CURIE),
        ColumnRule::copy("UCUM unit", UCUM_UNIT),
        ColumnRule::copy("Text definition", DEFINITION),
    ])
    .with_allow_list(ELEMENT, DOCUMENTED_ELEMENTS)
}
