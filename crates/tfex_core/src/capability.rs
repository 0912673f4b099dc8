//! Enabled-service detection.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tfex_runner::{QueryRequest, QueryRunner, RunConfig};
use tracing::{debug, info};

use crate::context::Account;
use crate::error::{CoreError, CoreResult};

/// Capability granted to a reachable organization.
pub const ORGANIZATION: &str = "organization";

/// Set of enabled service surfaces for one account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capabilities(BTreeSet<String>);

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, capability: &str) -> bool {
        self.0.contains(capability)
    }

    pub fn insert(&mut self, capability: impl Into<String>) -> bool {
        self.0.insert(capability.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Capabilities in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Capabilities {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Service identifier without its API domain, e.g. `compute.googleapis.com`
/// becomes `compute`.
pub fn normalize_service(raw: &str) -> &str {
    let name = raw.rsplit('/').next().unwrap_or(raw);
    name.strip_suffix(".googleapis.com").unwrap_or(name)
}

fn service_name(entry: &Json) -> Option<&str> {
    entry
        .get("config")
        .and_then(|c| c.get("name"))
        .and_then(Json::as_str)
        .or_else(|| entry.get("name").and_then(Json::as_str))
        .filter(|s| !s.is_empty())
}

/// Detection outcome.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detection {
    pub capabilities: Capabilities,
    /// Display name of a detected organization
    pub display_name: Option<String>,
}

/// Queries the service registry once per account.
pub struct CapabilityDetector {
    runner: Arc<dyn QueryRunner>,
    run_config: RunConfig,
}

impl CapabilityDetector {
    pub fn new(runner: Arc<dyn QueryRunner>, run_config: RunConfig) -> Self {
        Self { runner, run_config }
    }

    /// Enabled capabilities for `account`. Any query failure is fatal.
    pub async fn detect(&self, account: &Account) -> CoreResult<Capabilities> {
        Ok(self.detect_account(account).await?.capabilities)
    }

    /// Capabilities plus account details gathered on the way.
    pub async fn detect_account(&self, account: &Account) -> CoreResult<Detection> {
        let detection_error = |source| CoreError::Detection {
            account: account.to_string(),
            source,
        };

        let detection = match account {
            Account::Project(id) => {
                let request = QueryRequest::new(["services", "list", "--enabled"]).project(id);
                let entries = self
                    .runner
                    .query_list(&request, &self.run_config)
                    .await
                    .map_err(detection_error)?;
                let capabilities = entries
                    .iter()
                    .filter_map(service_name)
                    .map(normalize_service)
                    .collect();
                Detection {
                    capabilities,
                    display_name: None,
                }
            }
            Account::Organization(id) => {
                let request = QueryRequest::new(["organizations", "describe", id.as_str()]);
                let org = self
                    .runner
                    .query(&request, &self.run_config)
                    .await
                    .map_err(detection_error)?;
                Detection {
                    capabilities: Capabilities::from_iter([ORGANIZATION]),
                    display_name: org.get("displayName").and_then(Json::as_str).map(str::to_string),
                }
            }
        };

        if detection.capabilities.is_empty() {
            info!("No enabled services found for {}", account);
        } else {
            debug!(
                "Capabilities for {}: {}",
                account,
                detection.capabilities.iter().collect::<Vec<_>>().join(", ")
            );
        }
        Ok(detection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tfex_runner::{MockResponse, MockRunner};

    #[test]
    fn test_normalize_service() {
        assert_eq!(normalize_service("compute.googleapis.com"), "compute");
        assert_eq!(normalize_service("projects/1/services/pubsub.googleapis.com"), "pubsub");
        assert_eq!(normalize_service("sql-component.googleapis.com"), "sql-component");
        assert_eq!(normalize_service("custom"), "custom");
    }

    #[tokio::test]
    async fn test_detect_project_services() {
        let runner = MockRunner::new().on_json(
            "services list --enabled",
            json!([
                {"config": {"name": "compute.googleapis.com"}, "state": "ENABLED"},
                {"name": "projects/123/services/storage.googleapis.com"}
            ]),
        );
        let detector = CapabilityDetector::new(Arc::new(runner), RunConfig::default());
        let caps = detector.detect(&Account::Project("p".to_string())).await.unwrap();

        assert_eq!(caps.iter().collect::<Vec<_>>(), vec!["compute", "storage"]);
    }

    #[tokio::test]
    async fn test_empty_service_list_is_not_an_error() {
        let runner = MockRunner::new().on_json("services list", json!([]));
        let detector = CapabilityDetector::new(Arc::new(runner), RunConfig::default());
        let caps = detector.detect(&Account::Project("p".to_string())).await.unwrap();
        assert!(caps.is_empty());
    }

    #[tokio::test]
    async fn test_detection_failure_is_fatal() {
        let runner = MockRunner::new().on("services list", MockResponse::permission_denied("serviceusage.services.list"));
        let detector = CapabilityDetector::new(Arc::new(runner), RunConfig::default());
        let err = detector.detect(&Account::Project("p".to_string())).await.unwrap_err();
        assert!(err.is_detection());
    }

    #[tokio::test]
    async fn test_detect_organization() {
        let runner = MockRunner::new().on_json(
            "organizations describe 42",
            json!({"name": "organizations/42", "displayName": "example.com"}),
        );
        let detector = CapabilityDetector::new(Arc::new(runner), RunConfig::default());
        let detection = detector
            .detect_account(&Account::Organization("42".to_string()))
            .await
            .unwrap();

        assert!(detection.capabilities.contains(ORGANIZATION));
        assert_eq!(detection.display_name.as_deref(), Some("example.com"));
    }
}
