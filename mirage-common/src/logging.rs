//! Logging bootstrap
//!
//! `RUST_LOG` wins when set; otherwise the configured level is used.

use crate::{Error, Result};
use tracing_subscriber::EnvFilter;

/// Levels accepted in `[logging] level` and `--log-level`
pub const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Check a log level string against [`VALID_LOG_LEVELS`] (case-insensitive)
pub fn is_valid_level(level: &str) -> bool {
    VALID_LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str())
}

/// Build the filter used by [`init_tracing`]
pub fn build_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    if !is_valid_level(level) {
        return Err(Error::Config(format!(
            "Invalid log level '{}', expected one of: {}",
            level,
            VALID_LOG_LEVELS.join(", ")
        )));
    }

    EnvFilter::try_new(level.to_ascii_lowercase())
        .map_err(|e| Error::Config(format!("Invalid log filter: {}", e)))
}

/// Install the global fmt subscriber (stderr)
pub fn init_tracing(level: &str) -> Result<()> {
    let filter = build_filter(level)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to install tracing subscriber: {}", e)))
}
