//! Extraction settings.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tfex_hcl::{ProviderSettings, DEFAULT_PROVIDER_VERSION, DEFAULT_REGION};
use tfex_runner::{RunConfig, DEFAULT_TIMEOUT_SECONDS};

use crate::error::{CoreError, CoreResult};
use crate::extract::ScopeConfig;

/// Settings for one extraction run.
///
/// Loaded from YAML or TOML; command-line flags override file values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Output directory; defaults to one derived from the account
    pub output_dir: Option<PathBuf>,
    /// Regions for regional listings (empty = one global call)
    pub regions: Vec<String>,
    /// Zones for zonal listings (empty = one global call)
    pub zones: Vec<String>,
    pub timeout_seconds: u64,
    pub gcloud_path: String,
    /// Routines to run even without their capability
    pub force: Vec<String>,
    /// Run every routine regardless of capabilities
    pub force_all: bool,
    pub provider_region: String,
    pub provider_version: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            regions: Vec::new(),
            zones: Vec::new(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            gcloud_path: "gcloud".to_string(),
            force: Vec::new(),
            force_all: false,
            provider_region: DEFAULT_REGION.to_string(),
            provider_version: DEFAULT_PROVIDER_VERSION.to_string(),
        }
    }
}

impl ExtractConfig {
    /// Load from a `.yaml`/`.yml` or `.toml` file.
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = fs::read_to_string(path)?;
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let config: Self = match extension {
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e))),
            "toml" => toml::from_str(&content)
                .map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e))),
            other => Err(CoreError::Config(format!(
                "{}: unsupported config format '{}'",
                path.display(),
                other
            ))),
        }?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would leave upstream calls unbounded.
    pub fn validate(&self) -> CoreResult<()> {
        if self.timeout_seconds == 0 {
            return Err(CoreError::Config(
                "timeout_seconds must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_regions(mut self, regions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.regions = regions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_zones(mut self, zones: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.zones = zones.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_force(mut self, routine: impl Into<String>) -> Self {
        self.force.push(routine.into());
        self
    }

    pub fn with_force_all(mut self, force_all: bool) -> Self {
        self.force_all = force_all;
        self
    }

    /// Whether a gated-out routine should run anyway.
    pub fn is_forced(&self, routine: &str) -> bool {
        self.force_all || self.force.iter().any(|r| r == routine)
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig::default().timeout(self.timeout_seconds)
    }

    pub fn scopes(&self) -> ScopeConfig {
        ScopeConfig {
            regions: self.regions.clone(),
            zones: self.zones.clone(),
        }
    }

    pub fn provider(&self) -> ProviderSettings {
        ProviderSettings::default()
            .with_region(&self.provider_region)
            .with_version(&self.provider_version)
    }
}
