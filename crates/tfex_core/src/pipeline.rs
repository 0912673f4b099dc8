//! Per-account run: detect, extract, generate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tfex_hcl::OutputAssembler;
use tfex_runner::QueryRunner;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::capability::CapabilityDetector;
use crate::catalog::ExtractionCatalog;
use crate::config::ExtractConfig;
use crate::context::{Account, RunContext};
use crate::error::{CoreError, CoreResult};
use crate::extract::ResourceExtractor;
use crate::summary::{AccountOutcome, BatchReport, RunSummary, Warning};

/// Drives extraction and generation for one or more accounts.
pub struct Pipeline {
    runner: Arc<dyn QueryRunner>,
    catalog: ExtractionCatalog,
    config: ExtractConfig,
}

impl Pipeline {
    pub fn new(runner: Arc<dyn QueryRunner>, config: ExtractConfig) -> Self {
        Self {
            runner,
            catalog: ExtractionCatalog::standard(),
            config,
        }
    }

    pub fn with_catalog(mut self, catalog: ExtractionCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ExtractionCatalog {
        &self.catalog
    }

    /// Detect capabilities and run every applicable routine.
    ///
    /// Only detection failure is fatal; everything else is recorded in
    /// the returned context.
    pub async fn extract(&self, account: &Account) -> CoreResult<RunContext> {
        let detector = CapabilityDetector::new(self.runner.clone(), self.config.run_config());
        let detection = detector.detect_account(account).await?;
        let mut ctx = RunContext::new(account.clone(), detection.capabilities)
            .with_display_name(detection.display_name);

        let extractor = ResourceExtractor::new(
            self.runner.clone(),
            self.config.run_config(),
            self.config.scopes(),
        );

        for routine in self.catalog.for_account(account.kind()) {
            if !routine.should_run(&ctx.capabilities) {
                if self.config.is_forced(routine.id) {
                    warn!(
                        "Forcing {} without capability ({})",
                        routine.id,
                        routine.requires.describe()
                    );
                    ctx.forced.push(routine.id.to_string());
                } else {
                    debug!("Skipping {}: requires {}", routine.id, routine.requires.describe());
                    ctx.gated_out.push(routine.id.to_string());
                    continue;
                }
            }

            let parents = routine.source.parent().map(|p| ctx.model.get(p)).unwrap_or_default();
            let extraction = extractor.extract(routine, account, parents).await;
            ctx.model.extend(routine.id, extraction.descriptors);
            for warning in extraction.warnings {
                ctx.record(warning);
            }
        }

        Ok(ctx)
    }

    /// Write the configuration files and model dump into `destination`.
    ///
    /// An unusable destination is fatal; a single failed file is recorded
    /// and the remaining files are still written.
    pub fn generate(&self, ctx: &mut RunContext, destination: &Path) -> CoreResult<()> {
        let assembler = OutputAssembler::new(self.config.provider());
        assembler.prepare_destination(destination)?;

        let convert_ctx = ctx
            .account
            .convert_context()
            .with_display_name(ctx.display_name.as_deref());
        let assembly = assembler.assemble(&ctx.model, &convert_ctx);
        ctx.skipped += assembly.skipped;
        for malformed in assembly.warnings {
            ctx.record(malformed);
        }

        for unit in &assembly.units {
            match assembler.write(unit, destination) {
                Ok(path) => ctx.files.push(path),
                Err(err) => ctx.record(Warning::WriteFailure {
                    file: unit.file_name.clone(),
                    cause: err.to_string(),
                }),
            }
        }

        match assembler.write_dump(&ctx.model, destination) {
            Ok(path) => ctx.files.push(path),
            Err(err) => ctx.record(Warning::WriteFailure {
                file: tfex_hcl::DUMP_FILE.to_string(),
                cause: err.to_string(),
            }),
        }
        Ok(())
    }

    /// Output directory for `account`: explicit, configured, or derived.
    pub fn destination_for(&self, account: &Account, explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| self.config.output_dir.clone())
            .unwrap_or_else(|| account.default_output_dir())
    }

    /// Full run for one account.
    pub async fn run(&self, account: &Account, destination: Option<&Path>) -> CoreResult<RunSummary> {
        let destination = self.destination_for(account, destination);
        let run_id = uuid::Uuid::new_v4();
        let span = info_span!("account", account = %account, run_id = %run_id);

        async {
            info!("Extracting {}", account);
            let mut ctx = self.extract(account).await?.with_run_id(run_id);
            self.generate(&mut ctx, &destination)?;
            let summary = ctx.into_summary();
            info!(
                "Finished {}: {} resources, {} warnings",
                account,
                summary.total(),
                summary.warnings.len()
            );
            Ok::<_, CoreError>(summary)
        }
        .instrument(span)
        .await
    }

    /// Run accounts one after another, each in its own subdirectory of
    /// the output root. A failed account does not stop the ones after it.
    pub async fn run_batch(&self, accounts: &[Account], output_root: Option<&Path>) -> BatchReport {
        let root = output_root
            .map(Path::to_path_buf)
            .or_else(|| self.config.output_dir.clone());
        let mut report = BatchReport::default();
        for account in accounts {
            let destination = root.as_ref().map(|root| root.join(account.dir_name()));
            let result = self.run(account, destination.as_deref()).await;
            if let Err(err) = &result {
                error!("{} failed: {}", account, err);
            }
            report.outcomes.push(AccountOutcome {
                account: account.clone(),
                result,
            });
        }
        report
    }
}
