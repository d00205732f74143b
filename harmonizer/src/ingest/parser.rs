//! Line-oriented parser for priority-variable mapping files.
//!
//! The files look like YAML but are hand-maintained and frequently not valid
//! YAML, so they are read one trimmed line at a time. Each line is classified
//! by its leading keyword and applied to the deepest open record the current
//! [`ParseState`] allows. Lines that fit nowhere are ignored; malformed input
//! never fails the parse.

use super::clean::next_is_more_indented;
use super::model::{
    ClassEntry, ClassKind, ParsedFile, Property, RawVariable, ValueSet, VariableRecord,
    CLASS_HEADERS,
};

pub const PRIORITY_MARKER: &str = "priority_variable:";

/// How deep into the record tree the scan currently is.
///
/// Ordered so that `state >= InRawVariable` reads "a raw variable is open".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParseState {
    TopLevel,
    InVariable,
    InRawVariable,
    InValueSet,
    InClass,
}

/// Classification of one trimmed line; first matching rule wins.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Line<'a> {
    PriorityVariable,
    Name(&'a str),
    RawVariable(&'a str),
    Identifier(&'a str, &'a str),
    Value(&'a str),
    Function(&'a str),
    ClassHeader(&'a str),
    Property(&'a str, &'a str),
    Ignored,
}

fn after_colon(line: &str) -> &str {
    line.split_once(':').map_or("", |(_, rest)| rest.trim())
}

/// Colon lines starting with these are never properties.
const RESERVED_PREFIXES: [&str; 3] = ["MeasurementObservation:", "Condition:", "DrugExposure:"];

fn class_header(line: &str) -> Option<&str> {
    let name = line.strip_suffix(':')?;
    CLASS_HEADERS.iter().copied().find(|h| *h == name)
}

fn classify(line: &str) -> Line<'_> {
    if line.starts_with(PRIORITY_MARKER) {
        Line::PriorityVariable
    } else if line.starts_with("name:") {
        Line::Name(after_colon(line))
    } else if line.starts_with("phv:") || line.starts_with("raw_variable:") {
        Line::RawVariable(after_colon(line))
    } else if let Some(key) = ["phs", "pht", "input_data_type"]
        .into_iter()
        .find(|k| line.strip_prefix(k).map_or(false, |rest| rest.starts_with(':')))
    {
        Line::Identifier(key, after_colon(line))
    } else if let Some(rest) = line.strip_prefix("value:") {
        Line::Value(rest.trim())
    } else if line.starts_with("function:") {
        Line::Function(after_colon(line))
    } else if let Some(name) = class_header(line) {
        Line::ClassHeader(name)
    } else if RESERVED_PREFIXES.iter().any(|p| line.starts_with(p)) {
        Line::Ignored
    } else if line.contains(':') && !line.starts_with('#') {
        match line.split_once(':') {
            Some((key, value)) => Line::Property(key.trim(), value.trim()),
            None => Line::Ignored,
        }
    } else {
        Line::Ignored
    }
}

/// Consume a `function:` value and its continuation lines.
///
/// Continuation stops at the first line whose trimmed form ends with `:` or
/// starts with `value:`; blank and `#` lines inside are skipped. Returns the
/// joined text and the index of the terminating line.
fn read_function(lines: &[&str], start: usize, first: &str) -> (String, usize) {
    let mut pieces: Vec<&str> = Vec::new();
    if !first.is_empty() {
        pieces.push(first);
    }

    let mut j = start + 1;
    while j < lines.len() {
        let next = lines[j].trim();
        if next.ends_with(':') || next.starts_with("value:") {
            break;
        }
        if !next.is_empty() && !next.starts_with('#') {
            pieces.push(next);
        }
        j += 1;
    }

    (pieces.join(" "), j)
}

/// Scan state plus the record tree built so far.
struct Parser<'a> {
    lines: Vec<&'a str>,
    state: ParseState,
    parsed: ParsedFile,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().collect(),
            state: ParseState::TopLevel,
            parsed: ParsedFile::default(),
        }
    }

    fn variable(&mut self) -> Option<&mut VariableRecord> {
        self.parsed.variables.last_mut()
    }

    fn raw_variable(&mut self) -> Option<&mut RawVariable> {
        self.variable()?.raw_variables.last_mut()
    }

    fn value_set(&mut self) -> Option<&mut ValueSet> {
        self.raw_variable()?.value_sets.last_mut()
    }

    fn class(&mut self) -> Option<&mut ClassEntry> {
        self.value_set()?.classes.last_mut()
    }

    fn run(mut self) -> ParsedFile {
        let mut i = 0;
        while i < self.lines.len() {
            let line: &'a str = self.lines[i];
            i = self.apply(i, classify(line.trim()));
        }
        self.parsed
    }

    /// Apply one classified line; returns the index of the next line to scan.
    fn apply(&mut self, i: usize, line: Line<'a>) -> usize {
        use ParseState::*;

        match line {
            Line::PriorityVariable => {
                self.parsed.variables.push(VariableRecord::default());
                self.state = InVariable;
            }
            Line::Name(name) if self.state >= InVariable => {
                if let Some(variable) = self.variable() {
                    variable.name = name.to_string();
                }
            }
            Line::RawVariable(phv) if self.state >= InVariable => {
                if let Some(variable) = self.variable() {
                    variable.raw_variables.push(RawVariable::new(phv));
                    self.state = InRawVariable;
                }
            }
            Line::Identifier(key, value) if self.state >= InRawVariable => {
                if let Some(raw) = self.raw_variable() {
                    match key {
                        "phs" => raw.identifiers.phs = Some(value.to_string()),
                        "pht" => raw.identifiers.pht = Some(value.to_string()),
                        _ => raw.input_data_type = value.to_string(),
                    }
                }
            }
            Line::Value(value) if self.state >= InRawVariable => {
                if let Some(raw) = self.raw_variable() {
                    raw.value_sets.push(ValueSet::new(value));
                    self.state = InValueSet;
                }
            }
            Line::Function(first) if self.state >= InValueSet => {
                let (text, next) = read_function(&self.lines, i, first);
                if let Some(value_set) = self.value_set() {
                    value_set.function = text;
                }
                return next;
            }
            Line::ClassHeader(name) if self.state >= InValueSet => {
                if let Some(value_set) = self.value_set() {
                    value_set.classes.push(ClassEntry::new(ClassKind::from_name(name)));
                    self.state = InClass;
                }
            }
            Line::Property(key, value) if self.state >= InClass => {
                let property = if value.is_empty() && next_is_more_indented(&self.lines, i) {
                    Property::Group
                } else {
                    Property::Scalar(value.to_string())
                };
                if let Some(class) = self.class() {
                    class.assign(key, property);
                }
            }
            _ => {}
        }

        i + 1
    }
}

/// Parse a priority-variable file into its record tree.
pub fn parse_priority_variables(text: &str) -> ParsedFile {
    let parsed = Parser::new(text).run();
    tracing::debug!(
        variables = parsed.variables.len(),
        raw_variables = parsed.raw_variables().count(),
        "parsed priority variables"
    );
    parsed
}

/// Whether `text` is in the priority-variable format at all.
pub fn looks_like_priority_file(text: &str) -> bool {
    text.contains(PRIORITY_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY_WEIGHT: &str = r#"
priority_variable:
  name: body_weight
  phv: phv00007612
  phs: phs000007
  pht: pht000030
  input_data_type: decimal
  value_sets:
    value:
    function: convert pounds
      # reviewer note
      to kg
    MeasurementObservation:
      observation_type: OBA:VT0001259  # body weight
      value_quantity:
        unit: kg
      value_decimal:
"#;

    #[test]
    fn test_builds_record_tree() {
        let parsed = parse_priority_variables(BODY_WEIGHT);

        assert_eq!(parsed.variables.len(), 1);
        let variable = &parsed.variables[0];
        assert_eq!(variable.name, "body_weight");

        let raw = &variable.raw_variables[0];
        assert_eq!(raw.phv, "phv00007612");
        assert_eq!(raw.identifiers.pht.as_deref(), Some("pht000030"));
        assert_eq!(raw.input_data_type, "decimal");

        let value_set = &raw.value_sets[0];
        assert_eq!(value_set.value, "default");
        assert_eq!(value_set.function, "convert pounds to kg");

        let class = &value_set.classes[0];
        assert_eq!(class.kind, ClassKind::MeasurementObservation);
        assert_eq!(class.scalar("unit"), Some("kg"));
        assert_eq!(class.properties()[1], ("value_quantity".to_string(), Property::Group));
        // Trailing bare key with nothing deeper is a scalar, just empty
        assert!(class.has("value_decimal"));
        assert_eq!(class.scalar("value_decimal"), None);
    }

    #[test]
    fn test_function_continuation_stops_at_key() {
        let text = "priority_variable:\nphv: phv1\nvalue: 1\nfunction: first\n  second\n  third\nCondition:\n  condition_status: PRESENT\n";
        let parsed = parse_priority_variables(text);
        let value_set = &parsed.variables[0].raw_variables[0].value_sets[0];

        assert_eq!(value_set.function, "first second third");
        // The terminating line is still classified
        assert_eq!(value_set.classes.len(), 1);
        assert_eq!(value_set.classes[0].scalar("condition_status"), Some("PRESENT"));
    }

    #[test]
    fn test_function_continuation_stops_at_value() {
        let text = "priority_variable:\nphv: phv1\nvalue: 1\nfunction: look at\n  phv2\nvalue: 2\n";
        let parsed = parse_priority_variables(text);
        let raw = &parsed.variables[0].raw_variables[0];

        assert_eq!(raw.value_sets.len(), 2);
        assert_eq!(raw.value_sets[0].function, "look at phv2");
        assert_eq!(raw.value_sets[1].value, "2");
    }

    #[test]
    fn test_guards_ignore_lines_without_parent() {
        let text = "name: orphan\nphv: phv0\nvalue: 1\nCondition:\npriority_variable:\nvalue: 1\nCondition:\n";
        let parsed = parse_priority_variables(text);

        assert_eq!(parsed.variables.len(), 1);
        assert_eq!(parsed.variables[0].name, "");
        assert!(parsed.variables[0].raw_variables.is_empty());
    }

    #[test]
    fn test_new_variable_resets_cursors() {
        let text = "priority_variable:\nphv: phv1\nvalue: 1\nCondition:\npriority_variable:\ncondition_status: PRESENT\n";
        let parsed = parse_priority_variables(text);

        let first_class = &parsed.variables[0].raw_variables[0].value_sets[0].classes[0];
        assert!(!first_class.has("condition_status"));
    }

    #[test]
    fn test_class_headers_and_comments() {
        let text = "priority_variable:\nraw_variable: phv3\nvalue: 2\nMeasurementObservationSet:\n  # note: ignored\n  focus: x\nDrugExposure:\n  drug_concept: RXNORM:1\n";
        let parsed = parse_priority_variables(text);
        let classes = &parsed.variables[0].raw_variables[0].value_sets[0].classes;

        assert_eq!(
            classes[0].kind,
            ClassKind::Unmapped("MeasurementObservationSet".into())
        );
        assert_eq!(classes[0].properties().len(), 1);
        assert_eq!(classes[1].kind, ClassKind::DrugExposure);
    }

    #[test]
    fn test_class_header_prefix_is_not_a_property() {
        let text = "priority_variable:\nphv: phv1\nvalue: 1\nCondition:\n  condition_status: PRESENT\nCondition: see notes\nDrugExposure: later\n";
        let parsed = parse_priority_variables(text);
        let classes = &parsed.variables[0].raw_variables[0].value_sets[0].classes;

        assert_eq!(classes.len(), 1);
        assert_eq!(
            classes[0].properties(),
            &[("condition_status".to_string(), Property::Scalar("PRESENT".into()))]
        );
    }

    #[test]
    fn test_marker_detection() {
        assert!(looks_like_priority_file(BODY_WEIGHT));
        assert!(!looks_like_priority_file("class_derivations:\n"));
        assert_eq!(parse_priority_variables("not: a mapping"), ParsedFile::default());
    }
}
