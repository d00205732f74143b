//! Grouped rendering of projected tables.
//!
//! Rows are partitioned by a categorical key and each group is serialized
//! into a document section. Identifier fields go through [`LinkTemplates`].
//!
//! # Architecture
//!
//! ```text
//! Projected rows (flat)              →  Groups (first-seen order)
//! ┌──────────────────────────────┐      ┌──────────────────────────┐
//! │ MeasurementObservation, bmi  │      │ MeasurementObservation   │
//! │ Demography, age              │  →   │   bmi, height            │
//! │ MeasurementObservation, hgt  │      ├──────────────────────────┤
//! └──────────────────────────────┘      │ Demography               │
//!                                       │   age                    │
//!                                       └──────────────────────────┘
//! ```

pub mod links;
pub mod markdown;

pub use links::{LinkTemplates, RenderedCurie};
pub use markdown::{render_variable_documentation, write_document, RenderedDocument};

use std::collections::HashMap;

use crate::error::TableResult;
use crate::table::Table;

/// Rows sharing one key value, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowGroup<'a> {
    pub key: String,
    pub rows: Vec<&'a [String]>,
}

/// Partition rows by the value of `key`.
///
/// Groups appear in the order their key is first seen; rows keep their order
/// within a group. Rows with an empty key belong to no group.
pub fn group_rows<'a>(table: &'a Table, key: &str) -> TableResult<Vec<RowGroup<'a>>> {
    let key_index = table.require_column(key)?;

    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<RowGroup<'a>> = Vec::new();

    for row in table.rows() {
        let value = row[key_index].as_str();
        if value.trim().is_empty() {
            continue;
        }
        let idx = *positions.entry(value).or_insert_with(|| {
            groups.push(RowGroup {
                key: value.to_string(),
                rows: Vec::new(),
            });
            groups.len() - 1
        });
        groups[idx].rows.push(row);
    }

    Ok(groups)
}

/// Cell of `row` by column name within `table`'s header; `""` when absent.
pub(crate) fn cell<'a>(table: &Table, row: &'a [String], column: &str) -> &'a str {
    table
        .column_index(column)
        .and_then(|i| row.get(i))
        .map(String::as_str)
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[(&str, &str)]) -> Table {
        Table::new(
            vec!["element".into(), "label".into()],
            rows.iter()
                .map(|(e, l)| vec![e.to_string(), l.to_string()])
                .collect(),
        )
    }

    #[test]
    fn test_groups_in_first_seen_order() {
        let t = table(&[
            ("SdohObservation", "income"),
            ("MeasurementObservation", "bmi"),
            ("SdohObservation", "education"),
            ("Demography", "age"),
        ]);
        let groups = group_rows(&t, "element").unwrap();

        let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["SdohObservation", "MeasurementObservation", "Demography"]);
        assert_eq!(groups[0].rows.len(), 2);
        assert_eq!(groups[0].rows[1][1], "education");
    }

    #[test]
    fn test_empty_key_rows_are_dropped() {
        let t = table(&[("", "orphan"), ("Demography", "age")]);
        let groups = group_rows(&t, "element").unwrap();
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn test_missing_key_column() {
        let t = table(&[]);
        assert!(group_rows(&t, "nope").is_err());
    }
}
