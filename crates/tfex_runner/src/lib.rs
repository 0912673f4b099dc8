//! # tfex_runner
//!
//! Upstream query execution for tfex.
//!
//! This crate wraps the `gcloud` command-line tool behind the
//! [`QueryRunner`] trait. Every call returns JSON or a classified error
//! ([`FailureKind`]) so callers can tell "service not enabled" apart from
//! permission and transport failures.
//!
//! # Features
//!
//! - **CLI Runner**: `gcloud ... --format=json` with a per-call timeout
//! - **Dry-Run Mode**: Log commands without executing them
//! - **Failure Classification**: not-enabled / permission / timeout / transport / parse
//! - **Mock Runner**: Prefix-routed scripted responses for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use tfex_runner::{CliRunner, CliRunnerOptions, QueryRequest, QueryRunner, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = CliRunner::new(CliRunnerOptions::default()).await?;
//!
//!     let request = QueryRequest::new(["compute", "networks", "list"]).project("my-project");
//!     let networks = runner.query_list(&request, &RunConfig::default().timeout(60)).await?;
//!     println!("{} networks", networks.len());
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod mock;
pub mod runner;

pub use cli::{CliRunner, CliRunnerOptions};
pub use config::{QueryRequest, RunConfig, DEFAULT_TIMEOUT_SECONDS};
pub use error::{FailureKind, RunnerError, RunnerResult};
pub use mock::{CapturedCall, MockResponse, MockRunner};
pub use runner::{into_items, ExecutionResult, QueryRunner};
