//! Spreadsheet loading.
//!
//! Spreadsheets are addressed by document name and worksheet name, the way
//! the harmonization team refers to them. Two backends exist:
//!
//! - [`GoogleSheetsClient`]: resolves the name through the Drive API and reads
//!   formatted cell values through the Sheets API.
//! - [`LocalSheetDir`]: reads CSV exports laid out as
//!   `<dir>/<spreadsheet>/<worksheet>.csv`.
//!
//! Either way the result is a normalized [`Table`]. Failures are fatal for
//! the invocation and are never retried.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use harmonizer::{Settings, SheetSource};
//!
//! let source = SheetSource::from_settings(&Settings::from_env())?;
//! let table = source.load("BDCHM Variable Mapping", "BDCHM Harmonized Variables V1").await?;
//! ```

use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::error::{SheetError, SheetResult, TableError};
use crate::table::{load_csv, Table};

const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const SHEETS_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// Where spreadsheets are read from.
#[derive(Debug, Clone)]
pub enum SheetSource {
    Google(GoogleSheetsClient),
    Local(LocalSheetDir),
}

impl SheetSource {
    /// Pick a backend: a local export directory wins over the remote service.
    pub fn from_settings(settings: &Settings) -> SheetResult<Self> {
        if let Some(dir) = &settings.sheets_dir {
            return Ok(Self::Local(LocalSheetDir::new(dir)));
        }
        let token = settings.sheets_token.clone().ok_or(SheetError::MissingToken)?;
        Ok(Self::Google(GoogleSheetsClient::new(token)))
    }

    /// Load one worksheet as a normalized table.
    pub async fn load(&self, spreadsheet: &str, worksheet: &str) -> SheetResult<Table> {
        tracing::info!(spreadsheet, worksheet, "loading worksheet");
        match self {
            Self::Google(client) => client.load(spreadsheet, worksheet).await,
            Self::Local(dir) => dir.load(spreadsheet, worksheet),
        }
    }
}

// =============================================================================
// Google Drive + Sheets
// =============================================================================

/// Google API client authenticated with a bearer token
#[derive(Debug, Clone)]
pub struct GoogleSheetsClient {
    token: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Google API error response
#[derive(Debug, Deserialize)]
struct GoogleError {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl GoogleSheetsClient {
    pub fn new(token: String) -> Self {
        Self {
            token,
            http: reqwest::Client::new(),
        }
    }

    /// Read a worksheet by spreadsheet and worksheet name.
    pub async fn load(&self, spreadsheet: &str, worksheet: &str) -> SheetResult<Table> {
        let id = self.find_spreadsheet_id(spreadsheet).await?;

        let url = values_url(&id, worksheet)?;
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .query(&[("valueRenderOption", "FORMATTED_VALUE"), ("majorDimension", "ROWS")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            if status.as_u16() == 400 && message.contains("Unable to parse range") {
                return Err(SheetError::WorksheetNotFound {
                    spreadsheet: spreadsheet.to_string(),
                    worksheet: worksheet.to_string(),
                });
            }
            return Err(SheetError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let range: ValueRange = response.json().await?;
        Ok(Table::from_grid(values_to_grid(range.values)))
    }

    async fn find_spreadsheet_id(&self, name: &str) -> SheetResult<String> {
        let query = drive_name_query(name);
        let response = self
            .http
            .get(DRIVE_FILES_URL)
            .bearer_auth(&self.token)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id,name)"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SheetError::Api {
                status: status.as_u16(),
                message: error_message(response).await,
            });
        }

        let list: DriveFileList = response.json().await?;
        list.files
            .into_iter()
            .next()
            .map(|f| f.id)
            .ok_or_else(|| SheetError::SpreadsheetNotFound(name.to_string()))
    }
}

async fn error_message(response: reqwest::Response) -> String {
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str::<GoogleError>(&text)
        .map(|e| e.error.message)
        .unwrap_or(text)
}

/// `values.get` endpoint for a whole worksheet, path segments percent-encoded.
fn values_url(spreadsheet_id: &str, worksheet: &str) -> SheetResult<reqwest::Url> {
    let mut url = reqwest::Url::parse(SHEETS_URL)
        .map_err(|e| SheetError::InvalidUrl(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| SheetError::InvalidUrl(SHEETS_URL.to_string()))?
        .push(spreadsheet_id)
        .push("values")
        .push(&a1_sheet_range(worksheet));
    Ok(url)
}

/// Drive search expression matching a spreadsheet by exact name.
fn drive_name_query(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
    format!("name = '{escaped}' and mimeType = '{SPREADSHEET_MIME}' and trashed = false")
}

/// A1 range selecting a whole worksheet.
fn a1_sheet_range(worksheet: &str) -> String {
    format!("'{}'", worksheet.replace('\'', "''"))
}

/// Formatted cell values to strings; numbers and booleans keep their text.
fn values_to_grid(values: Vec<Vec<Value>>) -> Vec<Vec<String>> {
    values
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| match cell {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect()
}

// =============================================================================
// Local exports
// =============================================================================

/// Directory of CSV exports, one sub-directory per spreadsheet
#[derive(Debug, Clone)]
pub struct LocalSheetDir {
    root: PathBuf,
}

impl LocalSheetDir {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, spreadsheet: &str, worksheet: &str) -> SheetResult<Table> {
        let dir = self.root.join(spreadsheet);
        if !dir.is_dir() {
            return Err(SheetError::SpreadsheetNotFound(spreadsheet.to_string()));
        }
        let path = dir.join(format!("{worksheet}.csv"));
        if !path.is_file() {
            return Err(SheetError::WorksheetNotFound {
                spreadsheet: spreadsheet.to_string(),
                worksheet: worksheet.to_string(),
            });
        }

        match load_csv(&path) {
            Ok(table) => Ok(table),
            // An exported but empty worksheet is an empty table, not an error.
            Err(TableError::EmptyFile) => Ok(Table::default()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_drive_query_escapes_quotes() {
        let q = drive_name_query("Corey's sheet");
        assert!(q.starts_with("name = 'Corey\\'s sheet'"));
        assert!(q.contains(SPREADSHEET_MIME));
    }

    #[test]
    fn test_a1_range_quotes_sheet_name() {
        assert_eq!(a1_sheet_range("right_join_full"), "'right_join_full'");
        assert_eq!(a1_sheet_range("Bob's"), "'Bob''s'");
    }

    #[test]
    fn test_values_url_encodes_worksheet() {
        let url = values_url("abc123", "BDCHM Harmonized Variables V1").unwrap();
        let url = url.as_str();
        assert!(url.starts_with("https://sheets.googleapis.com/v4/spreadsheets/abc123/values/"));
        assert!(url.contains("BDCHM%20Harmonized%20Variables%20V1"));
    }

    #[test]
    fn test_values_to_grid_never_null() {
        let grid = values_to_grid(vec![
            vec![json!("OMOP Standard Concept ID"), json!("Label")],
            vec![json!(4099154), Value::Null],
        ]);
        assert_eq!(grid[1], vec!["4099154".to_string(), String::new()]);
    }

    #[test]
    fn test_from_settings_requires_token_without_dir() {
        let err = SheetSource::from_settings(&Settings::default()).unwrap_err();
        assert!(matches!(err, SheetError::MissingToken));
    }

    #[tokio::test]
    async fn test_local_source_loads_export() {
        let dir = tempfile::tempdir().unwrap();
        let sheet_dir = dir.path().join("FHS_VariableProperties");
        std::fs::create_dir(&sheet_dir).unwrap();
        std::fs::write(
            sheet_dir.join("right_join_full.csv"),
            "Variable accession,BDCHM Label,,\nphv00000001.v1,bmi,,\n,,,\n",
        )
        .unwrap();

        let settings = Settings {
            sheets_dir: Some(dir.path().to_path_buf()),
            ..Settings::default()
        };
        let source = SheetSource::from_settings(&settings).unwrap();
        let table = source
            .load("FHS_VariableProperties", "right_join_full")
            .await
            .unwrap();

        assert_eq!(table.columns(), &["Variable accession", "BDCHM Label"]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_local_source_missing_worksheet() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("Book")).unwrap();

        let local = LocalSheetDir::new(dir.path());
        assert!(matches!(
            local.load("Book", "Sheet1"),
            Err(SheetError::WorksheetNotFound { .. })
        ));
        assert!(matches!(
            local.load("Other", "Sheet1"),
            Err(SheetError::SpreadsheetNotFound(_))
        ));
    }
}
