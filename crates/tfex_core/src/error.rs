//! Error types for the core module.

use thiserror::Error;
use tfex_hcl::HclError;
use tfex_runner::RunnerError;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that end an account's run.
///
/// Recoverable problems are [`crate::Warning`] values instead.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Capability detection failed for {account}: {source}")]
    Detection {
        account: String,
        #[source]
        source: RunnerError,
    },

    #[error("Output destination unusable: {0}")]
    Write(#[from] HclError),

    #[error("Invalid account: {0}")]
    InvalidAccount(String),

    #[error("Invalid catalog: {0}")]
    Catalog(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub fn is_detection(&self) -> bool {
        matches!(self, CoreError::Detection { .. })
    }

    pub fn is_write(&self) -> bool {
        matches!(self, CoreError::Write(_))
    }
}
