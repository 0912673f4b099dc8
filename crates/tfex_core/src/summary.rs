//! Warnings and run summaries.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tfex_runner::FailureKind;
use uuid::Uuid;

use crate::context::Account;
use crate::error::CoreError;

/// A recoverable problem recorded during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Warning {
    /// One routine/scope call failed; the rest of the run continued.
    QueryFailure {
        kind: String,
        scope: String,
        failure: FailureKind,
        cause: String,
    },
    /// One descriptor could not be converted or used as a parent.
    MalformedDescriptor {
        kind: String,
        index: usize,
        field: String,
    },
    /// One output file could not be written.
    WriteFailure { file: String, cause: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::QueryFailure {
                kind,
                scope,
                failure,
                cause,
            } => write!(f, "{} ({}): {}: {}", kind, scope, failure, cause),
            Warning::MalformedDescriptor { kind, index, field } => {
                write!(f, "{}[{}]: missing required field '{}'", kind, index, field)
            }
            Warning::WriteFailure { file, cause } => write!(f, "{}: write failed: {}", file, cause),
        }
    }
}

impl From<tfex_hcl::MalformedDescriptor> for Warning {
    fn from(m: tfex_hcl::MalformedDescriptor) -> Self {
        Warning::MalformedDescriptor {
            kind: m.kind,
            index: m.index,
            field: m.field.to_string(),
        }
    }
}

/// What one account's run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub account: Account,
    pub run_id: Uuid,
    /// Organization display name, when known
    pub display_name: Option<String>,
    pub capabilities: Vec<String>,
    /// Descriptor count per extracted kind
    pub counts: BTreeMap<String, usize>,
    /// Routines skipped for lack of a capability
    pub gated_out: Vec<String>,
    /// Routines run despite lacking a capability
    pub forced: Vec<String>,
    /// Platform-managed resources left out of the configuration
    pub skipped: usize,
    pub warnings: Vec<Warning>,
    pub files: Vec<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Warnings with repeats removed, first occurrence order.
    pub fn distinct_warnings(&self) -> Vec<&Warning> {
        let mut seen = HashSet::new();
        self.warnings.iter().filter(|w| seen.insert(w.to_string())).collect()
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Result of one account inside a batch.
#[derive(Debug)]
pub struct AccountOutcome {
    pub account: Account,
    pub result: Result<RunSummary, CoreError>,
}

/// Per-account results of a batch run, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<AccountOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &RunSummary> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&Account, &CoreError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.account, e)))
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed().next().is_none()
    }
}
