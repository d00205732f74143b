//! Empty-field removal for hand-edited mapping files.

use once_cell::sync::Lazy;
use regex::Regex;

/// An indented bare `key:` with nothing after it.
static EMPTY_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s+\w+:\s*$").expect("regex for empty fields"));

/// Drop bare `key:` lines that do not open a nested block.
///
/// A bare key survives only when the next non-blank line is more indented.
/// Every other line is kept verbatim.
pub fn remove_empty_fields(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();

    lines
        .iter()
        .enumerate()
        .filter(|&(i, line)| !EMPTY_FIELD.is_match(line) || next_is_more_indented(&lines, i))
        .map(|(_, line)| *line)
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Whether the next non-blank line after `i` is indented deeper than line `i`.
pub(crate) fn next_is_more_indented(lines: &[&str], i: usize) -> bool {
    let current = indent_of(lines[i]);
    lines[i + 1..]
        .iter()
        .find(|l| !l.trim().is_empty())
        .map_or(false, |next| indent_of(next) > current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_parent_with_children() {
        let text = "Condition:\n  value_quantity:\n\n    unit: kg\n";
        assert_eq!(remove_empty_fields(text), text);
    }

    #[test]
    fn test_drops_leaf_without_value() {
        let text = "Condition:\n  condition_status:\n  condition_concept: MONDO:1\n";
        assert_eq!(
            remove_empty_fields(text),
            "Condition:\n  condition_concept: MONDO:1\n"
        );
    }

    #[test]
    fn test_drops_trailing_empty_field() {
        let text = "Condition:\n  condition_provenance:   \n\n";
        assert_eq!(remove_empty_fields(text), "Condition:\n\n");
    }

    #[test]
    fn test_top_level_keys_are_untouched() {
        // Not indented, so not an empty-field candidate
        let text = "priority_variable:\nname: bmi";
        assert_eq!(remove_empty_fields(text), text);
    }
}
