//! CLI command definitions.
//!
//! Each subcommand maps to one way of driving the extraction pipeline.
//! Options shared by `extract` and `batch` live in [`RunOptions`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use thiserror::Error;
use tfex_core::{ExtractConfig, ExtractionCatalog, Pipeline, RunSummary};
use tfex_runner::{CliRunner, CliRunnerOptions};
use tracing::info;

pub mod batch;
pub mod catalog;
pub mod extract;

/// tfex - export live GCP infrastructure as Terraform configuration
#[derive(Parser)]
#[command(name = "tfex")]
#[command(version, about = "tfex - export live GCP infrastructure as Terraform configuration")]
#[command(long_about = r#"
tfex inventories a GCP project or organization through the gcloud CLI and
writes the resources it finds as Terraform configuration files.

COMMANDS:
  extract  → Extract one project or organization
  batch    → Extract several accounts, one after another
  catalog  → Show the extraction routines and what gates them

EXIT CODES:
  0 - Run completed (warnings are reported, not fatal)
  1 - General error
  2 - Capability detection failed
  3 - Output destination unusable
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract one project or organization
    Extract(extract::ExtractArgs),

    /// Extract several accounts with per-account isolation
    Batch(batch::BatchArgs),

    /// Print the routine table
    Catalog(catalog::CatalogArgs),
}

/// Options shared by every command that runs the pipeline.
#[derive(Args, Debug, Clone, Default)]
pub struct RunOptions {
    /// YAML or TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Region to list regional resources in (repeatable)
    #[arg(long = "region", value_name = "REGION")]
    pub regions: Vec<String>,

    /// Zone to list zonal resources in (repeatable)
    #[arg(long = "zone", value_name = "ZONE")]
    pub zones: Vec<String>,

    /// Run a routine even when its service is not enabled (repeatable)
    #[arg(long = "force", value_name = "ROUTINE")]
    pub force: Vec<String>,

    /// Run every routine regardless of enabled services
    #[arg(long)]
    pub force_all: bool,

    /// Per-query timeout in seconds
    #[arg(long, env = "TFEX_TIMEOUT", value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// gcloud executable
    #[arg(long, env = "TFEX_GCLOUD", value_name = "PATH")]
    pub gcloud: Option<String>,

    /// Log gcloud commands instead of executing them
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunOptions {
    /// Load the configuration file (if any) and apply flag overrides.
    pub fn load_config(&self) -> Result<ExtractConfig> {
        let mut config = match &self.config {
            Some(path) => ExtractConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => ExtractConfig::default(),
        };

        if !self.regions.is_empty() {
            config = config.with_regions(self.regions.iter().cloned());
        }
        if !self.zones.is_empty() {
            config = config.with_zones(self.zones.iter().cloned());
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        if let Some(gcloud) = &self.gcloud {
            config.gcloud_path = gcloud.clone();
        }
        for routine in &self.force {
            config = config.with_force(routine.clone());
        }
        if self.force_all {
            config = config.with_force_all(true);
        }

        config.validate()?;

        let catalog = ExtractionCatalog::standard();
        if let Some(unknown) = config.force.iter().find(|id| catalog.get(id).is_none()) {
            bail!("Unknown routine '{}' (see `tfex catalog`)", unknown);
        }

        Ok(config)
    }

    /// Build a pipeline backed by the gcloud CLI.
    pub async fn pipeline(&self) -> Result<Pipeline> {
        let config = self.load_config()?;

        let mut options = CliRunnerOptions::new().gcloud_path(config.gcloud_path.clone());
        if self.dry_run {
            info!("Dry-run mode: gcloud commands are logged, not executed");
            options = options.dry_run();
        }
        let runner = CliRunner::new(options)
            .await
            .context("gcloud is required to extract resources")?;

        Ok(Pipeline::new(Arc::new(runner), config))
    }
}

/// One or more accounts of a batch failed.
#[derive(Error, Debug)]
#[error("{failed} of {total} accounts failed")]
pub struct BatchFailure {
    pub failed: usize,
    pub total: usize,
    /// Exit code of the most severe failure
    pub exit_code: u8,
}

/// Print a finished run in the human-readable layout.
pub fn print_summary(summary: &RunSummary, destination: &Path) {
    match &summary.display_name {
        Some(name) => println!(
            "✅ Extracted {} ({}) in {}ms",
            summary.account,
            name,
            summary.duration_ms()
        ),
        None => println!("✅ Extracted {} in {}ms", summary.account, summary.duration_ms()),
    }

    println!("   📦 {} resources", summary.total());
    for (kind, count) in &summary.counts {
        println!("      {:<24} {}", kind, count);
    }

    if !summary.gated_out.is_empty() {
        println!(
            "   🚫 {} routines skipped (service not enabled)",
            summary.gated_out.len()
        );
    }
    if !summary.forced.is_empty() {
        println!("   ⚡ Forced: {}", summary.forced.join(", "));
    }
    if summary.skipped > 0 {
        println!("   ⏭️  {} provider-managed resources not converted", summary.skipped);
    }

    let warnings = summary.distinct_warnings();
    if !warnings.is_empty() {
        println!("   ⚠️  {} warnings:", warnings.len());
        for warning in warnings {
            println!("      - {}", warning);
        }
    }

    println!("   📁 {} files in {}", summary.files.len(), destination.display());
    for file in &summary.files {
        if let Some(name) = file.file_name() {
            println!("      - {}", name.to_string_lossy());
        }
    }
}

/// Print a finished run as pretty JSON.
pub fn print_json(summary: &RunSummary) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}
