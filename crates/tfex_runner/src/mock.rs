//! Mock query runner for testing.
//!
//! Provides a scripted implementation of the QueryRunner trait so that
//! extraction can be exercised without gcloud or network access.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;

use crate::config::{QueryRequest, RunConfig};
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{ExecutionResult, QueryRunner};

/// Predefined mock response for a query.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    /// Seconds after which the call reports a timeout instead of output.
    pub timeout_after: Option<u64>,
}

impl MockResponse {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
            duration_ms: 100,
            timeout_after: None,
        }
    }

    /// Successful response carrying a JSON document.
    pub fn json(value: Value) -> Self {
        Self::success(value.to_string())
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
            duration_ms: 100,
            timeout_after: None,
        }
    }

    /// Failure the way gcloud reports a disabled API.
    pub fn not_enabled(service: &str) -> Self {
        Self::failure(
            1,
            format!(
                "ERROR: (gcloud) {} API has not been used in project before or it is disabled.\n  reason: SERVICE_DISABLED",
                service
            ),
        )
    }

    /// Failure the way gcloud reports a missing IAM permission.
    pub fn permission_denied(permission: &str) -> Self {
        Self::failure(
            1,
            format!(
                "ERROR: (gcloud) PERMISSION_DENIED: Required '{}' permission",
                permission
            ),
        )
    }

    /// A call that exceeds its time budget.
    pub fn timeout(seconds: u64) -> Self {
        Self {
            timeout_after: Some(seconds),
            ..Self::success("")
        }
    }

    pub fn with_duration(mut self, ms: u64) -> Self {
        self.duration_ms = ms;
        self
    }
}

/// Captured call information for verification.
#[derive(Debug, Clone)]
pub struct CapturedCall {
    pub method: String,
    pub command_line: Option<String>,
    pub project: Option<String>,
}

/// Mock query runner for testing.
///
/// Responses are routed by command prefix: a request whose command line
/// starts with a registered prefix gets that route's response, the longest
/// matching prefix winning. Unrouted requests fall back to a sequence of
/// default responses, then to an empty listing.
#[derive(Clone)]
pub struct MockRunner {
    /// Whether the runner should report as available.
    available: Arc<RwLock<bool>>,
    /// Version string to return.
    version: Arc<RwLock<String>>,
    /// Prefix-routed responses.
    routes: Arc<RwLock<Vec<(String, MockResponse)>>>,
    /// Fallback responses for unrouted calls.
    responses: Arc<RwLock<Vec<MockResponse>>>,
    /// Index of next fallback response to return.
    response_index: Arc<AtomicUsize>,
    /// Captured calls for verification.
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
    /// Simulated failure to return (as a string message for ExecutionFailed).
    simulate_failure: Arc<RwLock<Option<String>>>,
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRunner {
    /// Create a new mock runner.
    pub fn new() -> Self {
        Self {
            available: Arc::new(RwLock::new(true)),
            version: Arc::new(RwLock::new("Google Cloud SDK (mock)".to_string())),
            routes: Arc::new(RwLock::new(Vec::new())),
            responses: Arc::new(RwLock::new(Vec::new())),
            response_index: Arc::new(AtomicUsize::new(0)),
            captured_calls: Arc::new(RwLock::new(Vec::new())),
            simulate_failure: Arc::new(RwLock::new(None)),
        }
    }

    /// Set whether the runner is available.
    pub fn set_available(self, available: bool) -> Self {
        *self.available.write() = available;
        self
    }

    /// Set the version string.
    pub fn set_version(self, version: impl Into<String>) -> Self {
        *self.version.write() = version.into();
        self
    }

    /// Route requests starting with `prefix` to `response`.
    pub fn on(self, prefix: impl Into<String>, response: MockResponse) -> Self {
        self.routes.write().push((prefix.into(), response));
        self
    }

    /// Route requests starting with `prefix` to a JSON document.
    pub fn on_json(self, prefix: impl Into<String>, value: Value) -> Self {
        self.on(prefix, MockResponse::json(value))
    }

    /// Add a fallback response for the next unrouted call.
    pub fn add_response(self, response: MockResponse) -> Self {
        self.responses.write().push(response);
        self
    }

    /// Set multiple fallback responses.
    pub fn with_responses(self, responses: Vec<MockResponse>) -> Self {
        *self.responses.write() = responses;
        self
    }

    /// Set a failure to simulate on every call.
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.simulate_failure.write() = Some(message.into());
        self
    }

    /// Clear all captured calls.
    pub fn clear_calls(&self) {
        self.captured_calls.write().clear();
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    /// Check if a specific method was called.
    pub fn was_called(&self, method: &str) -> bool {
        self.captured_calls
            .read()
            .iter()
            .any(|c| c.method == method)
    }

    /// Command lines of every executed request, in order.
    pub fn executed_commands(&self) -> Vec<String> {
        self.captured_calls
            .read()
            .iter()
            .filter(|c| c.method == "execute")
            .filter_map(|c| c.command_line.clone())
            .collect()
    }

    /// Check if any executed request starts with `prefix`.
    pub fn was_queried(&self, prefix: &str) -> bool {
        self.executed_commands().iter().any(|c| c.starts_with(prefix))
    }

    /// Record a call.
    fn record_call(&self, call: CapturedCall) {
        self.captured_calls.write().push(call);
    }

    /// Get the response for a request.
    fn response_for(&self, command_line: &str) -> MockResponse {
        let routes = self.routes.read();
        let routed = routes
            .iter()
            .filter(|(prefix, _)| command_line.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, response)| response.clone());
        if let Some(response) = routed {
            return response;
        }

        let responses = self.responses.read();
        if responses.is_empty() {
            return MockResponse::success("[]");
        }
        let index = self.response_index.fetch_add(1, Ordering::SeqCst);
        responses
            .get(index % responses.len())
            .cloned()
            .unwrap_or_else(|| MockResponse::success("[]"))
    }

    /// Check for simulated failure.
    fn check_failure(&self) -> RunnerResult<()> {
        if let Some(msg) = self.simulate_failure.read().clone() {
            return Err(RunnerError::ExecutionFailed(msg));
        }
        Ok(())
    }
}

#[async_trait]
impl QueryRunner for MockRunner {
    async fn is_available(&self) -> RunnerResult<bool> {
        self.record_call(CapturedCall {
            method: "is_available".to_string(),
            command_line: None,
            project: None,
        });
        Ok(*self.available.read())
    }

    async fn version(&self) -> RunnerResult<String> {
        self.record_call(CapturedCall {
            method: "version".to_string(),
            command_line: None,
            project: None,
        });
        self.check_failure()?;
        Ok(self.version.read().clone())
    }

    async fn execute(
        &self,
        request: &QueryRequest,
        _run_config: &RunConfig,
    ) -> RunnerResult<ExecutionResult> {
        let command_line = request.args.join(" ");
        self.record_call(CapturedCall {
            method: "execute".to_string(),
            command_line: Some(command_line.clone()),
            project: request.project.clone(),
        });

        self.check_failure()?;

        let response = self.response_for(&command_line);
        if let Some(seconds) = response.timeout_after {
            return Err(RunnerError::Timeout(seconds));
        }

        let started_at = Utc::now();
        let finished_at = started_at + chrono::Duration::milliseconds(response.duration_ms as i64);

        Ok(ExecutionResult {
            exit_code: response.exit_code,
            stdout: response.stdout,
            stderr: response.stderr,
            started_at,
            finished_at,
            duration_ms: response.duration_ms,
        })
    }
}
