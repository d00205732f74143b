//! Condition status synthesis from value sets.

use std::collections::BTreeMap;

use crate::ingest::{ClassKind, RawVariable, ValueSet};

/// Key used for the catch-all value set in `value_mappings`.
pub const DEFAULT_MAPPING_KEY: &str = ".";

/// Status keywords tried, in order, when a function defers to other data.
const STATUS_KEYWORDS: [&str; 3] = ["ABSENT", "PRESENT", "HISTORICAL"];

/// Source value -> condition status for one raw variable.
///
/// An explicit `condition_status` on the value set's first Condition class
/// wins. Otherwise, only when the function text says to "look at" another
/// variable, the status is guessed from keywords in that text, falling back
/// to `UNKNOWN`. Value sets matching neither rule get no entry.
pub fn status_value_mappings(raw: &RawVariable) -> BTreeMap<String, String> {
    let mut mappings = BTreeMap::new();

    for value_set in &raw.value_sets {
        let key = if value_set.is_default() {
            DEFAULT_MAPPING_KEY.to_string()
        } else {
            value_set.value.clone()
        };

        let explicit = value_set
            .classes
            .iter()
            .filter(|c| c.kind == ClassKind::Condition)
            .find_map(|c| c.scalar("condition_status"));

        if let Some(status) = explicit {
            mappings.insert(key, status.to_string());
        } else if value_set.function.to_lowercase().contains("look at") {
            let status = STATUS_KEYWORDS
                .iter()
                .find(|k| value_set.function.contains(*k))
                .copied()
                .unwrap_or("UNKNOWN");
            mappings.entry(key).or_insert_with(|| status.to_string());
        }
    }

    mappings
}

/// Note for value sets whose timing is relative to another visit.
///
/// Only flags the case for review; no date arithmetic happens here.
pub fn special_visit_note(value_sets: &[ValueSet]) -> Option<&'static str> {
    value_sets.iter().find_map(|vs| {
        if vs.function.contains("12 months before") {
            Some("Contains 12 months before visit calculation")
        } else if vs.function.contains("age at previous visit") {
            Some("Contains previous visit age calculation")
        } else {
            None
        }
    })
}
