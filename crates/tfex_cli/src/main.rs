//! tfex CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Run completed (recorded warnings included)
//! - 1: General error
//! - 2: Capability detection failed
//! - 3: Output destination unusable

use std::process::ExitCode;

use clap::Parser;
use tfex_core::CoreError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{BatchFailure, Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const DETECTION_FAILURE: u8 = 2;
    pub const WRITE_FAILURE: u8 = 3;

    /// Exit code for an error that ended an account's run.
    pub fn for_core_error(err: &CoreError) -> u8 {
        if err.is_detection() {
            Self::DETECTION_FAILURE
        } else if err.is_write() {
            Self::WRITE_FAILURE
        } else {
            Self::GENERAL_ERROR
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tfex={level},warn")));

    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let result = match cli.command {
        Commands::Extract(args) => commands::extract::execute(args).await,
        Commands::Batch(args) => commands::batch::execute(args).await,
        Commands::Catalog(args) => commands::catalog::execute(args),
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    if let Some(batch) = e.downcast_ref::<BatchFailure>() {
        return batch.exit_code;
    }
    e.downcast_ref::<CoreError>()
        .map(ExitCodes::for_core_error)
        .unwrap_or(ExitCodes::GENERAL_ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfex_hcl::HclError;
    use tfex_runner::RunnerError;

    fn destination_error() -> CoreError {
        CoreError::Write(HclError::Destination {
            path: "/readonly".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        })
    }

    #[test]
    fn test_detection_failure_exit_code() {
        let err = anyhow::Error::from(CoreError::Detection {
            account: "project acme".to_string(),
            source: RunnerError::Timeout(30),
        });
        assert_eq!(categorize_error(&err), ExitCodes::DETECTION_FAILURE);
    }

    #[test]
    fn test_write_failure_exit_code() {
        let err = anyhow::Error::from(destination_error());
        assert_eq!(categorize_error(&err), ExitCodes::WRITE_FAILURE);
    }

    #[test]
    fn test_context_keeps_core_error_visible() {
        let err = anyhow::Error::from(destination_error()).context("extract failed");
        assert_eq!(categorize_error(&err), ExitCodes::WRITE_FAILURE);
    }

    #[test]
    fn test_other_errors_are_general() {
        let err = anyhow::anyhow!("Unknown routine: lambdas");
        assert_eq!(categorize_error(&err), ExitCodes::GENERAL_ERROR);
    }

    #[test]
    fn test_batch_failure_carries_worst_code() {
        let err = anyhow::Error::from(BatchFailure {
            failed: 2,
            total: 3,
            exit_code: ExitCodes::WRITE_FAILURE,
        });
        assert_eq!(categorize_error(&err), ExitCodes::WRITE_FAILURE);
    }
}
