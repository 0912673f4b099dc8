//! CLI-based query runner backed by the `gcloud` tool.
//!
//! Every request becomes one `gcloud <args> [--project=<id>] --format=json`
//! invocation bounded by the configured timeout.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::config::{QueryRequest, RunConfig};
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{ExecutionResult, QueryRunner};

/// CLI runner options.
#[derive(Debug, Clone)]
pub struct CliRunnerOptions {
    /// Path or name of the gcloud executable
    pub gcloud_path: String,
    /// Dry-run mode (log commands, return empty listings)
    pub dry_run: bool,
    /// Extra flags appended to every invocation
    pub extra_flags: Vec<String>,
}

impl Default for CliRunnerOptions {
    fn default() -> Self {
        Self {
            gcloud_path: "gcloud".to_string(),
            dry_run: false,
            extra_flags: Vec::new(),
        }
    }
}

impl CliRunnerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gcloud_path(mut self, path: impl Into<String>) -> Self {
        self.gcloud_path = path.into();
        self
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn extra_flag(mut self, flag: impl Into<String>) -> Self {
        self.extra_flags.push(flag.into());
        self
    }
}

/// gcloud-backed query runner.
pub struct CliRunner {
    options: CliRunnerOptions,
}

impl CliRunner {
    /// Create a runner, verifying that gcloud can be launched.
    pub async fn new(options: CliRunnerOptions) -> RunnerResult<Self> {
        let runner = Self::with_options(options);
        if !runner.options.dry_run && !runner.is_available().await? {
            return Err(RunnerError::GcloudNotAvailable(format!(
                "'{}' could not be executed",
                runner.options.gcloud_path
            )));
        }
        info!("Using query tool: {}", runner.options.gcloud_path);
        Ok(runner)
    }

    /// Create a runner without checking availability.
    pub fn with_options(options: CliRunnerOptions) -> Self {
        Self { options }
    }

    /// Check if dry-run mode is enabled.
    pub fn is_dry_run(&self) -> bool {
        self.options.dry_run
    }

    /// Build the full argument list for a request.
    fn build_args(&self, request: &QueryRequest) -> Vec<String> {
        let mut args = request.args.clone();

        if let Some(project) = &request.project {
            args.push(format!("--project={}", project));
        }

        args.push("--format=json".to_string());
        args.push("--quiet".to_string());
        args.extend(self.options.extra_flags.iter().cloned());
        args
    }

    /// Format command for logging.
    fn format_command(&self, args: &[String]) -> String {
        let mut cmd = self.options.gcloud_path.clone();
        for arg in args {
            if arg.contains(' ') {
                cmd.push_str(&format!(" '{}'", arg));
            } else {
                cmd.push_str(&format!(" {}", arg));
            }
        }
        cmd
    }
}

#[async_trait]
impl QueryRunner for CliRunner {
    async fn is_available(&self) -> RunnerResult<bool> {
        let status = Command::new(&self.options.gcloud_path)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        Ok(status.map(|s| s.success()).unwrap_or(false))
    }

    async fn version(&self) -> RunnerResult<String> {
        let output = Command::new(&self.options.gcloud_path)
            .arg("--version")
            .output()
            .await
            .map_err(|e| RunnerError::ExecutionFailed(e.to_string()))?;

        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
        } else {
            Err(RunnerError::ExecutionFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ))
        }
    }

    async fn execute(
        &self,
        request: &QueryRequest,
        run_config: &RunConfig,
    ) -> RunnerResult<ExecutionResult> {
        let args = self.build_args(request);
        let cmd_str = self.format_command(&args);

        if self.options.dry_run {
            info!("[DRY-RUN] Would execute: {}", cmd_str);
            let now = Utc::now();
            return Ok(ExecutionResult {
                exit_code: 0,
                stdout: "[]".to_string(),
                stderr: String::new(),
                started_at: now,
                finished_at: now,
                duration_ms: 0,
            });
        }

        debug!("Executing: {}", cmd_str);

        let mut cmd = Command::new(&self.options.gcloud_path);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            RunnerError::ExecutionFailed(format!(
                "Failed to spawn {}: {}",
                self.options.gcloud_path, e
            ))
        })?;

        let started_at = Utc::now();
        let limit = run_config.limit_seconds();
        let output = match tokio::time::timeout(Duration::from_secs(limit), child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                error!("{} timed out after {}s", request, limit);
                return Err(RunnerError::Timeout(limit));
            }
        };
        let finished_at = Utc::now();
        let duration_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;

        let exit_code = output.status.code().unwrap_or(-1);
        if exit_code == 0 {
            debug!("{} completed in {}ms", request, duration_ms);
        } else {
            debug!(
                "{} failed with exit code {} after {}ms",
                request, exit_code, duration_ms
            );
        }

        Ok(ExecutionResult {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            started_at,
            finished_at,
            duration_ms,
        })
    }
}
