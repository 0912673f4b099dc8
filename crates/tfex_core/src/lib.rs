//! # tfex_core
//!
//! Capability-gated extraction pipeline for tfex.
//!
//! # Architecture
//!
//! - **CapabilityDetector**: asks the service registry which surfaces an
//!   account has enabled, once per run
//! - **ExtractionCatalog**: static routine table; gates routines on
//!   capabilities
//! - **ResourceExtractor**: one engine for every listing shape, with
//!   per-scope failure containment
//! - **Pipeline**: runs one account end to end, or a batch of accounts with
//!   per-account isolation
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tfex_core::{Account, ExtractConfig, Pipeline};
//! use tfex_runner::{CliRunner, CliRunnerOptions};
//!
//! let runner = CliRunner::new(CliRunnerOptions::new()).await?;
//! let pipeline = Pipeline::new(Arc::new(runner), ExtractConfig::default());
//! let summary = pipeline.run(&Account::Project("acme-prod".into()), None).await?;
//! println!("{} resources", summary.total());
//! ```

pub mod capability;
pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod summary;

pub use capability::{normalize_service, Capabilities, CapabilityDetector, Detection, ORGANIZATION};
pub use catalog::{
    BindFn, DeriveFn, ExtractionCatalog, Requirement, Routine, ScopeMode, Source, STANDARD_ROUTINES,
};
pub use config::ExtractConfig;
pub use context::{Account, AccountKind, RunContext};
pub use error::{CoreError, CoreResult};
pub use extract::{Extraction, ResourceExtractor, ScopeConfig};
pub use pipeline::Pipeline;
pub use summary::{AccountOutcome, BatchReport, RunSummary, Warning};
pub use tfex_hcl::IntermediateModel;
