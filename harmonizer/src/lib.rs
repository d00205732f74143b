//! # Harmonizer - BDCHM variable harmonization tools
//!
//! Harmonizer turns the spreadsheets and hand-written mapping files of the
//! harmonization team into documentation, QA/QC reports and LinkML-Map
//! class-derivation YAML.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Spreadsheet │────▶│  Projection │────▶│  Markdown   │   docs
//! │ (API / CSV) │──┐  └─────────────┘     └─────────────┘
//! └─────────────┘  │  ┌─────────────┐     ┌─────────────┐
//!                  └─▶│ Valid PHVs  │────▶│  QA/QC CSV  │   qaqc
//!                     └─────────────┘     └─────────────┘
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Priority   │────▶│   Parser    │────▶│   Derive    │   transform / conditions
//! │  variables  │     │ (line scan) │     │  (YAML)     │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! Each subcommand of the `harmonizer` binary is an independent entry point;
//! none of them calls another.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use harmonizer::{transform_priority_file, DeriveOptions};
//!
//! let text = std::fs::read_to_string("height.yaml")?;
//! print!("{}", transform_priority_file(&text, &DeriveOptions::default())?);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Environment settings
//! - [`table`] - Tables and local CSV loading
//! - [`sheets`] - Spreadsheet backends
//! - [`projection`] - Column projection
//! - [`render`] - Grouped Markdown rendering
//! - [`phv`] - Curated PHV lists
//! - [`report`] - QA/QC report
//! - [`ingest`] - Priority-variable parser
//! - [`derive`] - Class-derivation mapping
//! - [`validate`] - Ingest YAML validation

// Core modules
pub mod config;
pub mod error;
pub mod logging;

// Tables
pub mod sheets;
pub mod table;

// Documentation
pub mod projection;
pub mod render;

// QA/QC
pub mod phv;
pub mod report;

// Priority variables
pub mod derive;
pub mod ingest;

// Validation
pub mod validate;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CommandError,
    CommandResult,
    ProjectionError,
    ReportError,
    SheetError,
    TableError,
    TransformError,
    ValidationError,
};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::Settings;
pub use logging::init_logging;

// =============================================================================
// Re-exports - Tables
// =============================================================================

pub use sheets::{GoogleSheetsClient, LocalSheetDir, SheetSource};
pub use table::{load_csv, load_token_list, Table};

// =============================================================================
// Re-exports - Documentation
// =============================================================================

pub use projection::{
    variable_documentation_projection,
    ColumnRule,
    ColumnTransform,
    Projection,
};

pub use render::{
    render_variable_documentation,
    write_document,
    LinkTemplates,
    RenderedDocument,
};

// =============================================================================
// Re-exports - QA/QC
// =============================================================================

pub use phv::{ValidPhvs, COHORT_FILES};
pub use report::{build_report, default_sources, load_observations, write_report_csv, QaqcReport};

// =============================================================================
// Re-exports - Priority variables
// =============================================================================

pub use ingest::{looks_like_priority_file, parse_priority_variables, remove_empty_fields, ParsedFile};

pub use derive::{
    transform_directory,
    transform_priority_file,
    BatchSummary,
    ConditionTransformer,
    DeriveOptions,
    VisitLookup,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validate::{discover_ingest_files, validate_files, IngestFilter, ValidationSummary};
