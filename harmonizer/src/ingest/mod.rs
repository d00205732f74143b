//! Priority-variable mapping files: cleaning and parsing.

pub mod clean;
pub mod model;
pub mod parser;

pub use clean::remove_empty_fields;
pub use model::{
    ClassEntry, ClassKind, Identifiers, ParsedFile, Property, RawVariable, ValueSet, VariableRecord,
};
pub use parser::{looks_like_priority_file, parse_priority_variables, ParseState};
