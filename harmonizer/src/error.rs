//! Error types for the harmonization tools.
//!
//! Each tool owns the errors of its own concern:
//!
//! - [`TableError`] - local CSV and token-list loading
//! - [`SheetError`] - remote spreadsheet loading
//! - [`ProjectionError`] - column projection
//! - [`ReportError`] - QA/QC report generation
//! - [`TransformError`] - priority-variable and Condition transforms
//! - [`ValidationError`] - ingest YAML discovery
//! - [`CommandError`] - top-level, returned by every subcommand
//!
//! Conversion into [`CommandError`] is automatic via `From`, so `?` works
//! across tool boundaries. Nothing below `main` exits the process.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// Table Errors
// =============================================================================

/// Errors while reading local tabular files.
#[derive(Debug, Error)]
pub enum TableError {
    /// Failed to read file.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid CSV content.
    #[error("Invalid CSV format: {0}")]
    Parse(#[from] csv::Error),

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// A column the caller depends on is absent.
    #[error("Missing column: {0}")]
    MissingColumn(String),
}

// =============================================================================
// Sheet Errors
// =============================================================================

/// Errors from the remote spreadsheet service.
#[derive(Debug, Error)]
pub enum SheetError {
    /// No credentials configured.
    #[error("Missing HARMONIZER_SHEETS_TOKEN (or set HARMONIZER_SHEETS_DIR for local exports)")]
    MissingToken,

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// An endpoint URL could not be built.
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    /// The service answered with an error status.
    #[error("Sheets API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// No spreadsheet with that name is visible to the credentials.
    #[error("Spreadsheet not found: {0}")]
    SpreadsheetNotFound(String),

    /// The spreadsheet has no worksheet with that name.
    #[error("Worksheet '{worksheet}' not found in '{spreadsheet}'")]
    WorksheetNotFound {
        spreadsheet: String,
        worksheet: String,
    },

    /// Local export could not be read.
    #[error("Local sheet error: {0}")]
    Local(#[from] TableError),
}

// =============================================================================
// Projection Errors
// =============================================================================

/// Errors while projecting a table into a target schema.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// A rule refers to a source column the table does not have.
    #[error("Missing source column: {0}")]
    MissingColumn(String),

    /// The allow-list filter refers to a column that is not a target.
    #[error("Unknown key column: {0}")]
    UnknownKey(String),
}

// =============================================================================
// Report Errors
// =============================================================================

/// Errors during QA/QC report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Every configured source failed to load.
    #[error("No source sheet could be loaded")]
    NoSources,

    /// A source table lacks a required column.
    #[error("Source '{source_name}' is missing column '{column}'")]
    MissingColumn { source_name: String, column: String },

    /// Failed to write the report.
    #[error("Failed to write report: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("Report IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Transform Errors
// =============================================================================

/// Errors while transforming priority-variable files.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Input path does not exist.
    #[error("{0} does not exist")]
    MissingInput(PathBuf),

    /// Batch input is not a directory.
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    /// The visit lookup table is unusable.
    #[error("Lookup table error: {0}")]
    Lookup(#[from] TableError),

    /// YAML serialization failed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO error.
    #[error("Transform IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors while discovering files to validate.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Directory walk failed.
    #[error("Failed to walk {root}: {message}")]
    Walk { root: PathBuf, message: String },
}

// =============================================================================
// Command Errors (top-level)
// =============================================================================

/// Top-level error returned by every subcommand.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("Sheet error: {0}")]
    Sheet(#[from] SheetError),

    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for table operations.
pub type TableResult<T> = Result<T, TableError>;

/// Result type for sheet operations.
pub type SheetResult<T> = Result<T, SheetError>;

/// Result type for projection operations.
pub type ProjectionResult<T> = Result<T, ProjectionError>;

/// Result type for report operations.
pub type ReportResult<T> = Result<T, ReportError>;

/// Result type for transform operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for subcommands.
pub type CommandResult<T> = Result<T, CommandError>;
