//! Accounts and the per-run context.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tfex_hcl::{ConvertContext, IntermediateModel};
use tracing::warn;
use uuid::Uuid;

use crate::capability::Capabilities;
use crate::error::CoreError;
use crate::summary::{RunSummary, Warning};

/// Kind of account a routine applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Project,
    Organization,
}

/// The target of one extraction run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Account {
    Project(String),
    Organization(String),
}

impl Account {
    pub fn id(&self) -> &str {
        match self {
            Account::Project(id) | Account::Organization(id) => id,
        }
    }

    pub fn kind(&self) -> AccountKind {
        match self {
            Account::Project(_) => AccountKind::Project,
            Account::Organization(_) => AccountKind::Organization,
        }
    }

    /// Project to scope requests to.
    pub fn project(&self) -> Option<&str> {
        match self {
            Account::Project(id) => Some(id),
            Account::Organization(_) => None,
        }
    }

    /// Directory name used for this account's output.
    pub fn dir_name(&self) -> String {
        match self {
            Account::Project(id) => id.clone(),
            Account::Organization(id) => format!("org-{}", id),
        }
    }

    pub fn default_output_dir(&self) -> PathBuf {
        PathBuf::from(".").join(self.dir_name())
    }

    pub fn convert_context(&self) -> ConvertContext<'_> {
        match self {
            Account::Project(id) => ConvertContext::project(id),
            Account::Organization(id) => ConvertContext::organization(id),
        }
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Account::Project(id) => write!(f, "project {}", id),
            Account::Organization(id) => write!(f, "organization {}", id),
        }
    }
}

/// Parses `project:<id>`, `organization:<id>` (or `org:<id>`), or a bare
/// project id.
impl FromStr for Account {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (kind, id) = match s.split_once(':') {
            Some((kind, id)) => (Some(kind), id),
            None => (None, s),
        };
        if id.is_empty() || id.contains(char::is_whitespace) {
            return Err(CoreError::InvalidAccount(s.to_string()));
        }
        match kind {
            None | Some("project") => Ok(Account::Project(id.to_string())),
            Some("organization") | Some("org") => Ok(Account::Organization(id.to_string())),
            Some(_) => Err(CoreError::InvalidAccount(s.to_string())),
        }
    }
}

/// Everything one account's run accumulates.
///
/// A fresh context is built for every account, so nothing leaks between
/// accounts of a batch.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub account: Account,
    /// Read-only once detection has finished
    pub capabilities: Capabilities,
    pub display_name: Option<String>,
    pub model: IntermediateModel,
    pub warnings: Vec<Warning>,
    pub gated_out: Vec<String>,
    pub forced: Vec<String>,
    pub skipped: usize,
    pub files: Vec<PathBuf>,
    pub started_at: DateTime<Utc>,
}

impl RunContext {
    pub fn new(account: Account, capabilities: Capabilities) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            account,
            capabilities,
            display_name: None,
            model: IntermediateModel::new(),
            warnings: Vec::new(),
            gated_out: Vec::new(),
            forced: Vec::new(),
            skipped: 0,
            files: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn with_display_name(mut self, name: Option<String>) -> Self {
        self.display_name = name;
        self
    }

    /// Record a recoverable problem.
    pub fn record(&mut self, warning: impl Into<Warning>) {
        let warning = warning.into();
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn into_summary(self) -> RunSummary {
        RunSummary {
            counts: self.model.counts(),
            account: self.account,
            run_id: self.run_id,
            display_name: self.display_name,
            capabilities: self.capabilities.iter().map(str::to_string).collect(),
            gated_out: self.gated_out,
            forced: self.forced,
            skipped: self.skipped,
            warnings: self.warnings,
            files: self.files,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}
