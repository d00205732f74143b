//! Per-class slot rules.

use super::status::status_value_mappings;
use super::{ClassDerivation, DeriveContext, DeriveOptions, SlotSource};

/// Phrases in a value set's function text that mean "emit nothing".
const SKIP_PHRASES: [&str; 3] = ["do nothing", "skip", "omit"];

const REVIEW_NOTE: &str = "MANUAL REVIEW: no slot derivations defined for this class";

pub fn is_suppressed(function: &str) -> bool {
    let lower = function.to_lowercase();
    SKIP_PHRASES.iter().any(|p| lower.contains(p))
}

/// Unit conversions recognized in free-text function descriptions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnitConversion {
    PoundsToKg,
    MultiplyBy10,
}

impl UnitConversion {
    pub fn detect(function: &str) -> Option<Self> {
        let lower = function.to_lowercase();
        if lower.contains("pound") && lower.contains("kg") {
            Some(Self::PoundsToKg)
        } else if lower.contains("* 10") || (lower.contains("multiply") && lower.contains("10")) {
            Some(Self::MultiplyBy10)
        } else {
            None
        }
    }

    pub fn factor(self) -> f64 {
        match self {
            Self::PoundsToKg => 0.453592,
            Self::MultiplyBy10 => 10.0,
        }
    }

    /// Expression over the source column.
    pub fn expression(self, phv: &str) -> String {
        format!("{{{}}} * {}", phv, self.factor())
    }
}

/// Value with any trailing `# comment` removed.
pub(crate) fn strip_comment(value: &str) -> &str {
    value.split('#').next().unwrap_or("").trim()
}

pub fn measurement_observation(ctx: DeriveContext<'_>, options: &DeriveOptions) -> ClassDerivation {
    let DeriveContext {
        raw,
        value_set,
        class,
    } = ctx;
    let mut block = ClassDerivation::new(&class.kind, options);

    let numeric_input = matches!(raw.input_data_type.as_str(), "decimal" | "integer");
    if class.has("value_decimal") || numeric_input {
        let source = match UnitConversion::detect(&value_set.function) {
            Some(conversion) => SlotSource::Expression(conversion.expression(&raw.phv)),
            None => SlotSource::Column(raw.phv.clone()),
        };
        block.push("value_decimal", source);
    }

    if let Some(observation_type) = class.scalar("observation_type") {
        block.push(
            "observation_type",
            SlotSource::Literal(strip_comment(observation_type).to_string()),
        );
    }

    let unit = class.scalar("unit").map(strip_comment);
    if let Some(unit) = unit {
        block.push("value_quantity.unit", SlotSource::Literal(unit.to_string()));
    }

    if class.has("range_low") {
        let low = class.scalar("range_low").unwrap_or("");
        block.push(
            "range_low",
            SlotSource::Fields(vec![
                ("value_decimal".to_string(), low.to_string()),
                (
                    "unit".to_string(),
                    unit.unwrap_or("unit").to_string(),
                ),
            ]),
        );
    }

    if raw.input_data_type == "enum" && !value_set.is_default() {
        if let Some(value_enum) = class.scalar("value_enum") {
            block.push(
                "value_concept",
                SlotSource::Expression(format!(
                    "case(({{{}}} == {}, \"'{}'\"))",
                    raw.phv,
                    value_set.value,
                    strip_comment(value_enum)
                )),
            );
        }
    }

    block
}

pub fn condition(ctx: DeriveContext<'_>, options: &DeriveOptions) -> ClassDerivation {
    let DeriveContext { raw, class, .. } = ctx;
    let mut block = ClassDerivation::new(&class.kind, options);

    if let Some(concept) = class.scalar("condition_concept") {
        block.push(
            "condition_concept",
            SlotSource::Literal(strip_comment(concept).to_string()),
        );
    }

    let mappings = status_value_mappings(raw);
    let mut distinct: Vec<&String> = mappings.values().collect();
    distinct.sort();
    distinct.dedup();
    if distinct.len() > 1 {
        block.push(
            "condition_status",
            SlotSource::Mapped {
                column: raw.phv.clone(),
                mappings,
            },
        );
    } else if let Some(status) = class.scalar("condition_status") {
        block.push("condition_status", SlotSource::Literal(status.to_string()));
    }

    if let Some(provenance) = class.scalar("condition_provenance") {
        block.push(
            "condition_provenance",
            SlotSource::Literal(provenance.to_string()),
        );
    }

    block
}

pub fn drug_exposure(ctx: DeriveContext<'_>, options: &DeriveOptions) -> ClassDerivation {
    let class = ctx.class;
    let mut block = ClassDerivation::new(&class.kind, options);

    if let Some(concept) = class.scalar("drug_concept") {
        block.push("drug_concept", SlotSource::Literal(strip_comment(concept).to_string()));
    }

    // Older files spell the key "expsoure_provenance"
    let provenance = class
        .scalar("exposure_provenance")
        .or_else(|| class.scalar("expsoure_provenance"));
    if let Some(provenance) = provenance {
        block.push(
            "exposure_provenance",
            SlotSource::Literal(normalize_provenance(provenance)),
        );
    }

    block
}

/// `self-reported drug` -> `SELF_REPORTED_DRUG`
pub fn normalize_provenance(value: &str) -> String {
    value.replace([' ', '-'], "_").to_uppercase()
}

pub fn unmapped(ctx: DeriveContext<'_>, options: &DeriveOptions) -> ClassDerivation {
    tracing::warn!(class = %ctx.class.kind, phv = %ctx.raw.phv, "no slot derivations for class");
    let mut block = ClassDerivation::new(&ctx.class.kind, options);
    block.review_note = Some(REVIEW_NOTE.to_string());
    block
}
