//! Per-column string transforms applied during projection.

use serde::{Deserialize, Serialize};

/// All available column transforms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnTransform {
    /// Copy the cell unchanged
    Copy,

    /// Split on a delimiter and keep the first segment
    FirstSegment {
        #[serde(default = "default_segment_delimiter")]
        delimiter: String,
    },

    /// Prepend a literal namespace (`"0004979"` -> `"MONDO:0004979"`)
    Prefix { namespace: String },

    /// Render a numeric cell as text, dropping a zero fractional part
    NumericString,

    /// `NumericString`, then `Prefix`
    NumericPrefix { namespace: String },
}

fn default_segment_delimiter() -> String {
    ".".to_string()
}

impl ColumnTransform {
    /// Apply this transform to one cell.
    ///
    /// An empty cell always yields an empty cell: concatenating a namespace
    /// onto a missing value must not produce a half-formed identifier.
    pub fn apply(&self, value: &str) -> String {
        match self {
            ColumnTransform::Copy => value.to_string(),
            ColumnTransform::FirstSegment { delimiter } => {
                self.apply_first_segment(value, delimiter)
            }
            ColumnTransform::Prefix { namespace } => self.apply_prefix(value, namespace),
            ColumnTransform::NumericString => self.apply_numeric_string(value),
            ColumnTransform::NumericPrefix { namespace } => {
                let numeric = self.apply_numeric_string(value);
                self.apply_prefix(&numeric, namespace)
            }
        }
    }

    fn apply_first_segment(&self, value: &str, delimiter: &str) -> String {
        if delimiter.is_empty() {
            return value.to_string();
        }
        value.split(delimiter).next().unwrap_or("").to_string()
    }

    fn apply_prefix(&self, value: &str, namespace: &str) -> String {
        if value.trim().is_empty() {
            String::new()
        } else {
            format!("{}{}", namespace, value.trim())
        }
    }

    fn apply_numeric_string(&self, value: &str) -> String {
        let trimmed = value.trim();
        // Spreadsheet and dataframe exports render missing numbers as "nan"
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
            return String::new();
        }

        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                format!("{}", n as i64)
            }
            _ => trimmed.to_string(),
        }
    }
}
