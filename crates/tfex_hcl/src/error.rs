//! Error types for configuration generation.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for generation operations.
pub type HclResult<T> = Result<T, HclError>;

/// Errors that can occur while writing generated configuration.
#[derive(Error, Debug)]
pub enum HclError {
    #[error("Destination not writable: {path}: {source}")]
    Destination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
