//! Runtime settings read from the environment.
//!
//! A `.env` file in the working directory is loaded first (if present), so
//! operators can keep their access token next to the scripts they run.

use std::env;
use std::path::PathBuf;

/// Google access token (e.g. from `gcloud auth print-access-token`).
pub const ENV_SHEETS_TOKEN: &str = "HARMONIZER_SHEETS_TOKEN";

/// Directory of local sheet exports: `<dir>/<spreadsheet>/<worksheet>.csv`.
pub const ENV_SHEETS_DIR: &str = "HARMONIZER_SHEETS_DIR";

/// Override for the term-request tracker linked from `REQUESTED` cells.
pub const ENV_TRACKER_URL: &str = "HARMONIZER_TRACKER_URL";

/// Settings shared by the subcommands that talk to spreadsheets.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Bearer token for the Google Drive and Sheets APIs
    pub sheets_token: Option<String>,
    /// Local export directory; takes precedence over the remote service
    pub sheets_dir: Option<PathBuf>,
    /// Term-request tracker URL
    pub tracker_url: Option<String>,
}

impl Settings {
    /// Load `.env` (if present) and read settings from the environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        Self {
            sheets_token: non_empty_var(ENV_SHEETS_TOKEN),
            sheets_dir: non_empty_var(ENV_SHEETS_DIR).map(PathBuf::from),
            tracker_url: non_empty_var(ENV_TRACKER_URL),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
