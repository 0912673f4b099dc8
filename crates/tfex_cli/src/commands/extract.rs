//! Extract command - Export one project or organization.

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgGroup, Args};
use tfex_core::{Account, Pipeline};
use tracing::info;

use super::{print_json, print_summary, RunOptions};

#[derive(Args)]
#[command(group(
    ArgGroup::new("account")
        .required(true)
        .args(["project", "organization"]),
))]
pub struct ExtractArgs {
    /// Project id to extract
    #[arg(short, long)]
    pub project: Option<String>,

    /// Numeric organization id to extract
    #[arg(long, visible_alias = "org")]
    pub organization: Option<String>,

    /// Output directory (default: ./<project-id> or ./org-<org-id>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub options: RunOptions,
}

impl ExtractArgs {
    /// The account selected by `--project` or `--organization`.
    pub fn account(&self) -> Result<Account> {
        let token = match (&self.project, &self.organization) {
            (Some(project), _) => format!("project:{}", project),
            (None, Some(org)) => format!("organization:{}", org),
            (None, None) => anyhow::bail!("Either --project or --organization is required"),
        };
        Ok(token.parse::<Account>()?)
    }
}

pub async fn execute(args: ExtractArgs) -> Result<()> {
    let account = args.account()?;
    let pipeline = args.options.pipeline().await?;
    run(&pipeline, &account, args.output, args.options.json).await
}

/// Run one account and print its summary.
pub async fn run(
    pipeline: &Pipeline,
    account: &Account,
    output: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let destination = pipeline.destination_for(account, output.as_deref());
    info!("Writing to {}", destination.display());

    let summary = pipeline.run(account, Some(&destination)).await?;

    if json {
        print_json(&summary)
    } else {
        print_summary(&summary, &destination);
        Ok(())
    }
}
