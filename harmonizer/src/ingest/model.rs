//! Record tree produced by the priority-variable parser.
//!
//! ```text
//! ParsedFile
//! └── VariableRecord (priority_variable:)
//!     └── RawVariable (phv: / raw_variable:)
//!         └── ValueSet (value:)
//!             └── ClassEntry (MeasurementObservation: / Condition: / ...)
//! ```
//!
//! The tree is built in one forward scan and read once by the mappers.
//! Comments and unrecognized keys are not kept.

use std::fmt;

/// Headers that open a class entry inside a value set.
pub const CLASS_HEADERS: [&str; 4] = [
    "MeasurementObservation",
    "Condition",
    "DrugExposure",
    "MeasurementObservationSet",
];

/// Target class of a class entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClassKind {
    MeasurementObservation,
    Condition,
    DrugExposure,
    /// A class the mappers have no slot derivations for
    Unmapped(String),
}

impl ClassKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "MeasurementObservation" => Self::MeasurementObservation,
            "Condition" => Self::Condition,
            "DrugExposure" => Self::DrugExposure,
            other => Self::Unmapped(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::MeasurementObservation => "MeasurementObservation",
            Self::Condition => "Condition",
            Self::DrugExposure => "DrugExposure",
            Self::Unmapped(name) => name,
        }
    }
}

impl fmt::Display for ClassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value of a class property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    Scalar(String),
    /// Key that opened a nested block; its children are flattened alongside
    Group,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntry {
    pub kind: ClassKind,
    properties: Vec<(String, Property)>,
}

impl ClassEntry {
    pub fn new(kind: ClassKind) -> Self {
        Self {
            kind,
            properties: Vec::new(),
        }
    }

    /// Assign a property. Re-assigning a scalar overwrites it; assigning
    /// onto a group leaves the group in place.
    pub fn assign(&mut self, key: &str, value: Property) {
        match self.properties.iter_mut().find(|(k, _)| k == key) {
            Some((_, Property::Group)) => {}
            Some((_, existing)) => *existing = value,
            None => self.properties.push((key.to_string(), value)),
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.properties.iter().any(|(k, _)| k == key)
    }

    /// Non-empty scalar value of `key`.
    pub fn scalar(&self, key: &str) -> Option<&str> {
        self.properties.iter().find_map(|(k, v)| match v {
            Property::Scalar(s) if k == key && !s.is_empty() => Some(s.as_str()),
            _ => None,
        })
    }

    pub fn properties(&self) -> &[(String, Property)] {
        &self.properties
    }
}

/// One `value:` branch of a raw variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueSet {
    /// Source value, or `default` for the catch-all branch
    pub value: String,
    pub function: String,
    pub classes: Vec<ClassEntry>,
}

impl ValueSet {
    pub fn new(value: &str) -> Self {
        let value = if value.is_empty() { DEFAULT_VALUE } else { value };
        Self {
            value: value.to_string(),
            function: String::new(),
            classes: Vec::new(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.value.is_empty() || self.value == DEFAULT_VALUE
    }
}

pub const DEFAULT_VALUE: &str = "default";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identifiers {
    pub phs: Option<String>,
    pub pht: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawVariable {
    pub phv: String,
    pub identifiers: Identifiers,
    pub input_data_type: String,
    pub value_sets: Vec<ValueSet>,
}

impl RawVariable {
    pub fn new(phv: &str) -> Self {
        Self {
            phv: phv.to_string(),
            identifiers: Identifiers::default(),
            input_data_type: String::new(),
            value_sets: Vec::new(),
        }
    }

    /// Class entries of `kind` across every value set, in order.
    pub fn classes_of(&self, kind: ClassKind) -> impl Iterator<Item = &ClassEntry> + '_ {
        self.value_sets
            .iter()
            .flat_map(|vs| vs.classes.iter())
            .filter(move |c| c.kind == kind)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableRecord {
    pub name: String,
    pub raw_variables: Vec<RawVariable>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFile {
    pub variables: Vec<VariableRecord>,
}

impl ParsedFile {
    pub fn raw_variables(&self) -> impl Iterator<Item = &RawVariable> {
        self.variables.iter().flat_map(|v| v.raw_variables.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_kind_from_name() {
        assert_eq!(ClassKind::from_name("Condition"), ClassKind::Condition);
        assert_eq!(
            ClassKind::from_name("MeasurementObservationSet"),
            ClassKind::Unmapped("MeasurementObservationSet".into())
        );
        assert_eq!(ClassKind::DrugExposure.to_string(), "DrugExposure");
    }

    #[test]
    fn test_assign_onto_group_is_noop() {
        let mut entry = ClassEntry::new(ClassKind::MeasurementObservation);
        entry.assign("value_quantity", Property::Group);
        entry.assign("value_quantity", Property::Scalar("kg".into()));
        entry.assign("unit", Property::Scalar("lb".into()));
        entry.assign("unit", Property::Scalar("kg".into()));

        assert!(entry.has("value_quantity"));
        assert_eq!(entry.scalar("value_quantity"), None);
        assert_eq!(entry.scalar("unit"), Some("kg"));
        assert_eq!(entry.properties().len(), 2);
    }

    #[test]
    fn test_empty_scalar_is_absent() {
        let mut entry = ClassEntry::new(ClassKind::Condition);
        entry.assign("condition_status", Property::Scalar(String::new()));
        assert!(entry.has("condition_status"));
        assert_eq!(entry.scalar("condition_status"), None);
    }

    #[test]
    fn test_value_set_default() {
        assert_eq!(ValueSet::new("").value, "default");
        assert!(ValueSet::new("default").is_default());
        assert!(!ValueSet::new("1").is_default());
    }
}
