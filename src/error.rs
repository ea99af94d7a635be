//! Error types for the disk statistics source and the health checks.

use std::path::PathBuf;

/// Errors raised while opening or polling a diskstats source.
#[derive(Debug, thiserror::Error)]
pub enum DiskstatsError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed diskstats line {line:?}: {reason}")]
    Parse { line: String, reason: String },

    #[error("Poll interval must be greater than zero")]
    InvalidInterval,
}

/// Errors raised while configuring a health check.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error(transparent)]
    Diskstats(#[from] DiskstatsError),

    #[error("Check interval must be greater than zero")]
    InvalidInterval,

    #[error("Invalid probe URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
