//! Batch command - Extract several accounts one after another.
//!
//! A failed account is reported and the remaining accounts still run.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use tfex_core::{Account, BatchReport, Pipeline};

use super::{print_summary, BatchFailure, RunOptions};
use crate::ExitCodes;

#[derive(Args)]
pub struct BatchArgs {
    /// Accounts: `project:<id>`, `organization:<id>`, or a bare project id
    #[arg(required = true, value_name = "ACCOUNT")]
    pub accounts: Vec<String>,

    /// Directory that receives one subdirectory per account
    #[arg(long, value_name = "DIR")]
    pub output_root: Option<PathBuf>,

    #[command(flatten)]
    pub options: RunOptions,
}

pub async fn execute(args: BatchArgs) -> Result<()> {
    let accounts = args
        .accounts
        .iter()
        .map(|token| token.parse::<Account>())
        .collect::<Result<Vec<_>, _>>()?;
    let pipeline = args.options.pipeline().await?;
    run(&pipeline, &accounts, args.output_root, args.options.json).await
}

/// Run every account, print each outcome, and fail if any account failed.
pub async fn run(
    pipeline: &Pipeline,
    accounts: &[Account],
    output_root: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let report = pipeline.run_batch(accounts, output_root.as_deref()).await;

    if json {
        let summaries: Vec<_> = report.succeeded().collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        print_report(&report);
    }

    check(&report)
}

fn print_report(report: &BatchReport) {
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(summary) => {
                let destination = summary
                    .files
                    .first()
                    .and_then(|file| file.parent())
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| outcome.account.default_output_dir());
                print_summary(summary, &destination);
            }
            Err(err) => println!("❌ {}: {}", outcome.account, err),
        }
        println!();
    }

    let failed = report.failed().count();
    if failed == 0 {
        println!("✅ All {} accounts extracted", report.outcomes.len());
    } else {
        println!(
            "⚠️  {} of {} accounts extracted",
            report.outcomes.len() - failed,
            report.outcomes.len()
        );
    }
}

/// Turn a report with failed accounts into an error carrying the most
/// severe exit code.
fn check(report: &BatchReport) -> Result<()> {
    if report.all_succeeded() {
        return Ok(());
    }
    let exit_code = report
        .failed()
        .map(|(_, err)| ExitCodes::for_core_error(err))
        .max()
        .unwrap_or(ExitCodes::GENERAL_ERROR);
    Err(BatchFailure {
        failed: report.failed().count(),
        total: report.outcomes.len(),
        exit_code,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;
    use tempfile::tempdir;
    use tfex_core::ExtractConfig;
    use tfex_runner::{MockResponse, MockRunner};

    #[tokio::test]
    async fn test_failed_account_does_not_stop_batch() {
        let runner = MockRunner::new()
            .on(
                "organizations describe 7",
                MockResponse::permission_denied("resourcemanager.organizations.get"),
            )
            .on_json(
                "organizations describe 42",
                json!({"name": "organizations/42", "displayName": "acme.example"}),
            );
        let pipeline = Pipeline::new(Arc::new(runner), ExtractConfig::default());
        let dir = tempdir().unwrap();
        let accounts = vec![
            Account::Organization("7".to_string()),
            Account::Organization("42".to_string()),
        ];

        let err = run(&pipeline, &accounts, Some(dir.path().to_path_buf()), false)
            .await
            .unwrap_err();

        let failure = err.downcast_ref::<BatchFailure>().unwrap();
        assert_eq!(failure.failed, 1);
        assert_eq!(failure.total, 2);
        assert_eq!(failure.exit_code, ExitCodes::DETECTION_FAILURE);
        assert!(dir.path().join("org-42").join("provider.tf").exists());
        assert!(!dir.path().join("org-7").exists());
    }

    #[tokio::test]
    async fn test_clean_batch_succeeds() {
        let runner = MockRunner::new().on_json("services list", json!([]));
        let pipeline = Pipeline::new(Arc::new(runner), ExtractConfig::default());
        let dir = tempdir().unwrap();
        let accounts = vec![
            Account::Project("alpha".to_string()),
            Account::Project("beta".to_string()),
        ];

        run(&pipeline, &accounts, Some(dir.path().to_path_buf()), true)
            .await
            .unwrap();

        assert!(dir.path().join("alpha").join("variables.tf").exists());
        assert!(dir.path().join("beta").join("variables.tf").exists());
    }
}
