//! Record-to-template mapping.
//!
//! Every (value set, class entry) pair of a parsed file becomes at most one
//! [`ClassDerivation`] block. Which slots a block carries depends on the
//! entry's [`ClassKind`]; the per-kind rules live in [`templates`].
//!
//! ## Usage Flow
//!
//! ```text
//! text → parse_priority_variables → derive_class (per class entry) → serde_yaml documents
//! ```

pub mod batch;
pub mod conditions;
pub mod status;
pub mod templates;

pub use batch::{transform_directory, BatchSummary};
pub use conditions::{ConditionTransform, ConditionTransformer, VisitLookup};
pub use status::{special_visit_note, status_value_mappings};
pub use templates::{is_suppressed, UnitConversion};

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::error::TransformResult;
use crate::ingest::{parse_priority_variables, ClassEntry, ClassKind, RawVariable, ValueSet};

pub const DEFAULT_COHORT: &str = "FHS";

/// Options shared by every mapper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeriveOptions {
    /// Written as the class block's `populated_from`
    pub cohort: String,
}

impl Default for DeriveOptions {
    fn default() -> Self {
        Self {
            cohort: DEFAULT_COHORT.to_string(),
        }
    }
}

/// The records one class entry is derived from.
#[derive(Debug, Clone, Copy)]
pub struct DeriveContext<'a> {
    pub raw: &'a RawVariable,
    pub value_set: &'a ValueSet,
    pub class: &'a ClassEntry,
}

/// How one slot gets its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotSource {
    /// `populated_from: <column>`
    Column(String),
    /// `expr: "'<value>'"`, a LinkML string literal
    Literal(String),
    /// `populated_from: { expr: <expression> }`
    Expression(String),
    /// Nested literal fields, e.g. `range_low: { value_decimal, unit }`
    Fields(Vec<(String, String)>),
    /// `populated_from: <column>` plus `value_mappings`
    Mapped {
        column: String,
        mappings: BTreeMap<String, String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotDerivation {
    pub name: String,
    pub source: SlotSource,
}

impl SlotDerivation {
    pub fn new(name: &str, source: SlotSource) -> Self {
        Self {
            name: name.to_string(),
            source,
        }
    }
}

/// One `class_derivations` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDerivation {
    pub class_name: String,
    pub populated_from: String,
    pub slots: Vec<SlotDerivation>,
    /// Comment written above the block when it needs manual follow-up
    pub review_note: Option<String>,
}

impl ClassDerivation {
    pub fn new(kind: &ClassKind, options: &DeriveOptions) -> Self {
        Self {
            class_name: kind.name().to_string(),
            populated_from: options.cohort.clone(),
            slots: Vec::new(),
            review_note: None,
        }
    }

    pub fn push(&mut self, name: &str, source: SlotSource) {
        self.slots.push(SlotDerivation::new(name, source));
    }

    pub fn slot(&self, name: &str) -> Option<&SlotSource> {
        self.slots.iter().find(|s| s.name == name).map(|s| &s.source)
    }
}

#[derive(serde::Serialize)]
struct ExprRef<'a> {
    expr: &'a str,
}

/// `value_decimal: 0` stays numeric; anything else is a string.
fn field_value(value: &str) -> serde_yaml::Value {
    if let Ok(n) = value.parse::<i64>() {
        serde_yaml::Value::Number(n.into())
    } else if let Some(n) = value.parse::<f64>().ok().filter(|n| n.is_finite()) {
        serde_yaml::Value::Number(n.into())
    } else {
        serde_yaml::Value::String(value.to_string())
    }
}

impl Serialize for SlotSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            Self::Column(column) => map.serialize_entry("populated_from", column)?,
            Self::Literal(value) => map.serialize_entry("expr", &format!("'{}'", value))?,
            Self::Expression(expr) => map.serialize_entry("populated_from", &ExprRef { expr })?,
            Self::Fields(fields) => {
                for (key, value) in fields {
                    map.serialize_entry(key, &field_value(value))?;
                }
            }
            Self::Mapped { column, mappings } => {
                map.serialize_entry("populated_from", column)?;
                map.serialize_entry("value_mappings", mappings)?;
            }
        }
        map.end()
    }
}

/// Slots in push order.
struct Slots<'a>(&'a [SlotDerivation]);

impl Serialize for Slots<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for slot in self.0 {
            map.serialize_entry(&slot.name, &slot.source)?;
        }
        map.end()
    }
}

#[derive(serde::Serialize)]
struct ClassBody<'a> {
    populated_from: &'a str,
    slot_derivations: Slots<'a>,
}

impl Serialize for ClassDerivation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let body = ClassBody {
            populated_from: &self.populated_from,
            slot_derivations: Slots(&self.slots),
        };
        let classes = BTreeMap::from([(self.class_name.as_str(), body)]);

        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("class_derivations", &classes)?;
        map.end()
    }
}

impl ClassDerivation {
    /// YAML document, preceded by the review note as a `#` comment.
    pub fn to_yaml(&self) -> TransformResult<String> {
        let mut out = String::new();
        if let Some(note) = &self.review_note {
            let _ = writeln!(out, "# {}", note);
        }
        out.push_str(&serde_yaml::to_string(self)?);
        Ok(out)
    }
}

/// Map one class entry; `None` when the value set says to skip it.
pub fn derive_class(ctx: DeriveContext<'_>, options: &DeriveOptions) -> Option<ClassDerivation> {
    if is_suppressed(&ctx.value_set.function) {
        tracing::debug!(phv = %ctx.raw.phv, value = %ctx.value_set.value, "suppressed by function text");
        return None;
    }

    Some(match &ctx.class.kind {
        ClassKind::MeasurementObservation => templates::measurement_observation(ctx, options),
        ClassKind::Condition => templates::condition(ctx, options),
        ClassKind::DrugExposure => templates::drug_exposure(ctx, options),
        ClassKind::Unmapped(_) => templates::unmapped(ctx, options),
    })
}

/// Map every class entry of a parsed file, in file order.
pub fn derive_all(text: &str, options: &DeriveOptions) -> Vec<ClassDerivation> {
    let parsed = parse_priority_variables(text);

    let mut blocks = Vec::new();
    for raw in parsed.raw_variables() {
        for value_set in &raw.value_sets {
            for class in &value_set.classes {
                let ctx = DeriveContext {
                    raw,
                    value_set,
                    class,
                };
                blocks.extend(derive_class(ctx, options));
            }
        }
    }
    blocks
}

/// Transform a priority-variable file into class-derivation text.
///
/// Blocks are separated by one blank line.
pub fn transform_priority_file(text: &str, options: &DeriveOptions) -> TransformResult<String> {
    let docs = derive_all(text, options)
        .iter()
        .map(ClassDerivation::to_yaml)
        .collect::<TransformResult<Vec<_>>>()?;
    Ok(docs.join("\n"))
}
