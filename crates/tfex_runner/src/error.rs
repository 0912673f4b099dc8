//! Error types for the runner module.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Longest stderr excerpt carried in an error message.
const MAX_MESSAGE_LEN: usize = 200;

/// Errors that can occur while querying the upstream service.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("gcloud not available: {0}")]
    GcloudNotAvailable(String),

    #[error("Service not enabled: {0}")]
    NotEnabled(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Command exited with code {code}: {message}")]
    CommandFailed { code: i32, message: String },

    #[error("Command timeout after {0} seconds")]
    Timeout(u64),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Machine-distinguishable reason behind a failed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The API backing the query is disabled for the account.
    NotEnabled,
    /// The caller lacks permission for the query.
    PermissionDenied,
    /// The query did not finish within its time budget.
    Timeout,
    /// Process, network or generic command failure.
    Transport,
    /// The query succeeded but its output was not valid JSON.
    Parse,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotEnabled => "not_enabled",
            Self::PermissionDenied => "permission_denied",
            Self::Timeout => "timeout",
            Self::Transport => "transport",
            Self::Parse => "parse",
        };
        write!(f, "{}", s)
    }
}

fn not_enabled_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)(SERVICE_DISABLED|has not been used in project|is not enabled|API \[[^\]]+\] not enabled|it is disabled)",
        )
        .expect("valid not-enabled pattern")
    })
}

fn permission_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)(PERMISSION_DENIED|does not have permission|permission denied|403 Forbidden|Required '[^']+' permission)",
        )
        .expect("valid permission pattern")
    })
}

impl RunnerError {
    /// Build an error from a command that exited non-zero, classifying it
    /// by the text gcloud printed on stderr.
    pub fn from_failed_command(code: i32, stderr: &str) -> Self {
        let message = summarize(stderr);
        if not_enabled_pattern().is_match(stderr) {
            Self::NotEnabled(message)
        } else if permission_pattern().is_match(stderr) {
            Self::PermissionDenied(message)
        } else {
            Self::CommandFailed { code, message }
        }
    }

    /// Classify the error.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::NotEnabled(_) => FailureKind::NotEnabled,
            Self::PermissionDenied(_) => FailureKind::PermissionDenied,
            Self::Timeout(_) => FailureKind::Timeout,
            Self::Json(_) => FailureKind::Parse,
            Self::GcloudNotAvailable(_)
            | Self::CommandFailed { .. }
            | Self::ExecutionFailed(_)
            | Self::Io(_) => FailureKind::Transport,
        }
    }

    /// True when the failure only means "this service is off".
    pub fn is_not_enabled(&self) -> bool {
        self.failure_kind() == FailureKind::NotEnabled
    }
}

/// Pick the most informative stderr line and bound its length.
fn summarize(stderr: &str) -> String {
    let line = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .find(|l| l.starts_with("ERROR"))
        .or_else(|| stderr.lines().map(str::trim).filter(|l| !l.is_empty()).last())
        .unwrap_or("unknown error");

    if line.chars().count() > MAX_MESSAGE_LEN {
        line.chars().take(MAX_MESSAGE_LEN).collect()
    } else {
        line.to_string()
    }
}
