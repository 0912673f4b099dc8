//! Generic extraction engine.
//!
//! One engine runs every [`Source`] shape. Failures are contained at the
//! smallest unit: one region, one zone or one parent. "Service not
//! enabled" responses are dropped silently; everything else becomes a
//! [`Warning::QueryFailure`].

use std::sync::Arc;

use serde_json::Value as Json;
use tfex_hcl::Descriptor;
use tfex_runner::{into_items, QueryRequest, QueryRunner, RunConfig, RunnerError};
use tracing::{debug, info};

use crate::catalog::{expand_args, Routine, ScopeMode, Source};
use crate::context::Account;
use crate::summary::Warning;

/// Locations regional and zonal routines iterate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeConfig {
    pub regions: Vec<String>,
    pub zones: Vec<String>,
}

impl ScopeConfig {
    /// `(label, extra args)` for each call a scope mode needs.
    fn calls(&self, mode: ScopeMode) -> Vec<(String, Vec<String>)> {
        let split = |flag: &str, label: &str, values: &[String]| {
            if values.is_empty() {
                vec![("global".to_string(), Vec::new())]
            } else {
                values
                    .iter()
                    .map(|v| (format!("{} {}", label, v), vec![format!("{}={}", flag, v)]))
                    .collect()
            }
        };
        match mode {
            ScopeMode::Global => vec![("global".to_string(), Vec::new())],
            ScopeMode::Regional(flag) => split(flag, "region", &self.regions),
            ScopeMode::Zonal(flag) => split(flag, "zone", &self.zones),
        }
    }
}

/// Descriptors and contained failures of one routine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub descriptors: Vec<Descriptor>,
    pub warnings: Vec<Warning>,
}

/// Runs routines against the upstream query service.
pub struct ResourceExtractor {
    runner: Arc<dyn QueryRunner>,
    run_config: RunConfig,
    scopes: ScopeConfig,
}

impl ResourceExtractor {
    pub fn new(runner: Arc<dyn QueryRunner>, run_config: RunConfig, scopes: ScopeConfig) -> Self {
        Self {
            runner,
            run_config,
            scopes,
        }
    }

    /// Extract one routine for `account`.
    ///
    /// `parents` is the parent kind's listing for child routines and is
    /// ignored otherwise. Never fails; empty listings yield no descriptors.
    pub async fn extract(&self, routine: &Routine, account: &Account, parents: &[Descriptor]) -> Extraction {
        let mut extraction = Extraction::default();

        match routine.source {
            Source::List { args, scope } => {
                let base = expand_args(args, account.id());
                for (label, extra) in self.scopes.calls(scope) {
                    let request = self.request(account, base.iter().chain(&extra));
                    self.list_into(&mut extraction, routine.id, &label, &request).await;
                }
            }
            Source::PerParent { parent, args, bind } => {
                let base = expand_args(args, account.id());
                for (index, descriptor) in parents.iter().enumerate() {
                    let extra = match bind(descriptor) {
                        Ok(extra) => extra,
                        Err(missing) => {
                            extraction.warnings.push(Warning::MalformedDescriptor {
                                kind: parent.to_string(),
                                index,
                                field: missing.0.to_string(),
                            });
                            continue;
                        }
                    };
                    let label = format!("{} {}", parent, extra.join(" "));
                    let request = self.request(account, base.iter().chain(&extra));
                    self.list_into(&mut extraction, routine.id, &label, &request).await;
                }
            }
            Source::Derived { derive, .. } => {
                extraction.descriptors = parents.iter().flat_map(derive).collect();
            }
            Source::Expand { args, field } => {
                let request = self.request(account, expand_args(args, account.id()).iter());
                match self.runner.query(&request, &self.run_config).await {
                    Ok(mut value) => {
                        let items = value.get_mut(field).map(Json::take).unwrap_or(Json::Null);
                        extraction.descriptors = into_items(items);
                    }
                    Err(err) => record_failure(&mut extraction, routine.id, "global", err),
                }
            }
        }

        info!("Extracted {} {}", extraction.descriptors.len(), routine.id);
        extraction
    }

    fn request<'a>(&self, account: &Account, args: impl Iterator<Item = &'a String>) -> QueryRequest {
        let request = QueryRequest::new(args.cloned());
        match account.project() {
            Some(project) => request.project(project),
            None => request,
        }
    }

    async fn list_into(&self, extraction: &mut Extraction, kind: &str, scope: &str, request: &QueryRequest) {
        match self.runner.query_list(request, &self.run_config).await {
            Ok(items) => {
                debug!("{} ({}): {} items", kind, scope, items.len());
                extraction.descriptors.extend(items);
            }
            Err(err) => record_failure(extraction, kind, scope, err),
        }
    }
}

fn record_failure(extraction: &mut Extraction, kind: &str, scope: &str, err: RunnerError) {
    if err.is_not_enabled() {
        debug!("{} ({}): service not enabled, skipping", kind, scope);
        return;
    }
    extraction.warnings.push(Warning::QueryFailure {
        kind: kind.to_string(),
        scope: scope.to_string(),
        failure: err.failure_kind(),
        cause: err.to_string(),
    });
}
