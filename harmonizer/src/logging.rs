//! Logging setup.
//!
//! Diagnostics (warnings about skipped records, flagged identifiers, debug
//! traces) go through `tracing` to stderr. The progress lines each command
//! prints for the operator are plain output and do not depend on the level.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` wins over the verbosity count.
pub fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "harmonizer=warn",
        1 => "harmonizer=info",
        2 => "harmonizer=debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second init (tests driving main helpers) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .with_line_number(verbose >= 3)
        .try_init();
}
