//! Provider, variable and organization declarations.

use serde::{Deserialize, Serialize};

use crate::block::{Body, ConfigBlock, Value};
use crate::convert::ConvertContext;

pub const DEFAULT_REGION: &str = "us-central1";
pub const DEFAULT_PROVIDER_VERSION: &str = "~> 5.0";

/// Settings for the generated `google` provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub region: String,
    pub version: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            version: DEFAULT_PROVIDER_VERSION.to_string(),
        }
    }
}

impl ProviderSettings {
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// `terraform` and `provider "google"` blocks.
    pub fn provider_blocks(&self, ctx: &ConvertContext<'_>) -> Vec<ConfigBlock> {
        let mut required = Body::new();
        required.attr(
            "google",
            Value::Map(vec![
                ("source".to_string(), Value::from("hashicorp/google")),
                ("version".to_string(), Value::from(self.version.as_str())),
            ]),
        );
        let mut terraform = Body::new();
        terraform.nested("required_providers", required);

        let mut provider = Body::new();
        if ctx.project.is_some() {
            provider.attr("project", Value::var("project_id"));
        }
        provider.attr("region", Value::var("region"));

        vec![
            ConfigBlock::new("terraform", Vec::new(), terraform),
            ConfigBlock::new("provider", vec!["google".to_string()], provider),
        ]
    }

    /// Input variables defaulting to the extracted account.
    pub fn variable_blocks(&self, ctx: &ConvertContext<'_>) -> Vec<ConfigBlock> {
        let mut blocks = Vec::new();
        if let Some(project) = ctx.project {
            blocks.push(variable("project_id", "GCP project ID", project));
        }
        if let Some(org) = ctx.organization {
            let description = match ctx.display_name {
                Some(name) => format!("GCP organization ID ({})", name),
                None => "GCP organization ID".to_string(),
            };
            blocks.push(variable("org_id", &description, org));
        }
        blocks.push(variable("region", "Default region", &self.region));
        blocks
    }
}

fn variable(name: &str, description: &str, default: &str) -> ConfigBlock {
    let mut body = Body::new();
    body.attr("description", description)
        .attr("type", Value::Expression("string".to_string()))
        .attr("default", default);
    ConfigBlock::new("variable", vec![name.to_string()], body)
}

/// `data "google_organization"` lookup for organization accounts.
pub fn organization_blocks(ctx: &ConvertContext<'_>) -> Vec<ConfigBlock> {
    ctx.organization
        .map(|_| {
            let mut body = Body::new();
            if let Some(name) = ctx.display_name {
                body.comment(name);
            }
            body.attr(
                "organization",
                Value::Expression("\"organizations/${var.org_id}\"".to_string()),
            );
            vec![ConfigBlock::data("google_organization", "org", body)]
        })
        .unwrap_or_default()
}
