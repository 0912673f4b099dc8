//! Query runner trait and types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::{QueryRequest, RunConfig};
use crate::error::{RunnerError, RunnerResult};

/// Result of one upstream invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Exit code of the process
    pub exit_code: i32,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
    /// Execution start time
    pub started_at: DateTime<Utc>,
    /// Execution end time
    pub finished_at: DateTime<Utc>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl ExecutionResult {
    /// Check if execution was successful (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Get combined output (stdout + stderr).
    pub fn combined_output(&self) -> String {
        if self.stdout.is_empty() {
            self.stderr.clone()
        } else if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }

    /// Parse stdout as JSON, treating empty output as an empty listing.
    pub fn json(&self) -> RunnerResult<Value> {
        let trimmed = self.stdout.trim();
        if trimmed.is_empty() {
            return Ok(Value::Array(Vec::new()));
        }
        Ok(serde_json::from_str(trimmed)?)
    }
}

/// Upstream query service.
///
/// Implementations run one request at a time; callers await each call
/// before issuing the next.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    /// Check if the query tool is available.
    async fn is_available(&self) -> RunnerResult<bool>;

    /// Get version information for the query tool.
    async fn version(&self) -> RunnerResult<String>;

    /// Run a request and capture its raw output.
    async fn execute(
        &self,
        request: &QueryRequest,
        run_config: &RunConfig,
    ) -> RunnerResult<ExecutionResult>;

    /// Run a request and return its JSON output.
    ///
    /// Non-zero exits are classified into not-enabled, permission and
    /// generic failures.
    async fn query(&self, request: &QueryRequest, run_config: &RunConfig) -> RunnerResult<Value> {
        let result = self.execute(request, run_config).await?;
        if !result.success() {
            return Err(RunnerError::from_failed_command(result.exit_code, &result.stderr));
        }
        debug!("{} returned {} bytes", request, result.stdout.len());
        result.json()
    }

    /// Run a listing request and return its items.
    ///
    /// A single object is treated as a one-element listing and `null` as
    /// an empty one.
    async fn query_list(
        &self,
        request: &QueryRequest,
        run_config: &RunConfig,
    ) -> RunnerResult<Vec<Value>> {
        Ok(into_items(self.query(request, run_config).await?))
    }
}

/// Flatten a JSON listing into its items.
pub fn into_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(stdout: &str) -> ExecutionResult {
        ExecutionResult {
            exit_code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            duration_ms: 0,
        }
    }

    #[test]
    fn test_empty_stdout_is_empty_listing() {
        assert_eq!(result("  \n").json().unwrap(), json!([]));
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = result("not json").json().unwrap_err();
        assert_eq!(err.failure_kind(), crate::FailureKind::Parse);
    }

    #[test]
    fn test_into_items() {
        assert_eq!(into_items(json!([1, 2])).len(), 2);
        assert_eq!(into_items(json!({"bindings": []})).len(), 1);
        assert!(into_items(Value::Null).is_empty());
    }
}
