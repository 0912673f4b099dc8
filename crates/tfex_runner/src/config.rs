//! Query configuration types.

use serde::{Deserialize, Serialize};

/// Default time budget for one upstream call.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

/// One "list resources of kind K" request against the upstream service.
///
/// `args` holds the gcloud subcommand and its kind-specific flags; output
/// format and project selection are appended by the runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Subcommand and flags, e.g. `["compute", "networks", "list"]`
    pub args: Vec<String>,
    /// Project the request is scoped to, if any
    pub project: Option<String>,
}

impl QueryRequest {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            project: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Human-readable form used for logging and mock matching.
    pub fn command_line(&self) -> String {
        let mut line = self.args.join(" ");
        if let Some(project) = &self.project {
            line.push_str(&format!(" --project={}", project));
        }
        line
    }
}

impl std::fmt::Display for QueryRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.command_line())
    }
}

/// Execution settings applied to every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Timeout in seconds; 0 falls back to the default
    pub timeout_seconds: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl RunConfig {
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Effective per-call bound in seconds. Never zero.
    pub fn limit_seconds(&self) -> u64 {
        if self.timeout_seconds == 0 {
            DEFAULT_TIMEOUT_SECONDS
        } else {
            self.timeout_seconds
        }
    }
}
