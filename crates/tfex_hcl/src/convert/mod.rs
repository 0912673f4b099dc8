//! Per-kind descriptor converters.
//!
//! Each resource kind has one pure function turning a descriptor into a
//! [`Declaration`]. Converters read only the fields they know, omit absent
//! optional fields, keep repeated entries in source order, and report a
//! missing structural field instead of failing the run.

pub mod compute;
pub mod iam;
pub mod network;
pub mod org;
pub mod services;

use serde_json::{Number, Value as Json};

use crate::block::{Body, Value};
use crate::model::Descriptor;

/// Account identifiers converters may need for `project`/`org_id` fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertContext<'a> {
    pub project: Option<&'a str>,
    pub organization: Option<&'a str>,
    /// Human-readable account name, when the upstream reports one
    pub display_name: Option<&'a str>,
}

impl<'a> ConvertContext<'a> {
    pub fn project(project: &'a str) -> Self {
        Self {
            project: Some(project),
            ..Self::default()
        }
    }

    pub fn organization(organization: &'a str) -> Self {
        Self {
            organization: Some(organization),
            ..Self::default()
        }
    }

    pub fn with_display_name(mut self, display_name: Option<&'a str>) -> Self {
        self.display_name = display_name;
        self
    }
}

/// A resource declaration before its identifier is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub resource_type: &'static str,
    /// Raw name the identifier is derived from
    pub name_hint: String,
    pub body: Body,
}

impl Declaration {
    pub fn new(resource_type: &'static str, name_hint: impl Into<String>, body: Body) -> Self {
        Self {
            resource_type,
            name_hint: name_hint.into(),
            body,
        }
    }
}

/// Outcome of converting one descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    Declare(Declaration),
    /// Provider-managed resource that must not be declared
    Skip(&'static str),
}

/// A structurally required field was absent or had the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingField(pub &'static str);

pub type ConvertResult = Result<Conversion, MissingField>;

pub type Converter = fn(&Descriptor, &ConvertContext<'_>) -> ConvertResult;

/// Kind to converter. Dump-only kinds have no row.
const CONVERTERS: &[(&str, Converter)] = &[
    ("networks", network::network),
    ("subnets", network::subnet),
    ("firewalls", network::firewall),
    ("routes", network::route),
    ("routers", network::router),
    ("vpn_gateways", network::vpn_gateway),
    ("vpn_tunnels", network::vpn_tunnel),
    ("peerings", network::peering),
    ("instances", compute::instance),
    ("buckets", services::bucket),
    ("functions", services::function),
    ("gke_clusters", services::gke_cluster),
    ("node_pools", services::node_pool),
    ("sql_instances", services::sql_instance),
    ("pubsub_topics", services::pubsub_topic),
    ("pubsub_subscriptions", services::pubsub_subscription),
    ("service_accounts", iam::service_account),
    ("folders", org::folder),
    ("subfolders", org::folder),
    ("org_policy_details", org::org_policy),
    ("org_iam_bindings", org::org_iam_binding),
    ("tag_keys", org::tag_key),
    ("tag_values", org::tag_value),
];

/// Wrap a finished body as a declaration.
pub(crate) fn declare(resource_type: &'static str, name_hint: &str, body: Body) -> ConvertResult {
    Ok(Conversion::Declare(Declaration::new(resource_type, name_hint, body)))
}

/// Look up the converter for a resource kind.
pub fn converter_for(kind: &str) -> Option<Converter> {
    CONVERTERS
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, converter)| *converter)
}

/// Kinds that have a converter.
pub fn converter_kinds() -> impl Iterator<Item = &'static str> {
    CONVERTERS.iter().map(|(k, _)| *k)
}

/// Convert one descriptor of `kind`; `None` for dump-only kinds.
pub fn convert(kind: &str, descriptor: &Descriptor, ctx: &ConvertContext<'_>) -> Option<ConvertResult> {
    converter_for(kind).map(|converter| converter(descriptor, ctx))
}

/// Last path segment of a resource URL or name.
pub fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Path segment that follows `marker`, e.g. the cluster in
/// `.../clusters/<name>/nodePools/...`.
pub fn segment_after<'a>(path: &'a str, marker: &str) -> Option<&'a str> {
    let mut parts = path.split('/');
    while let Some(part) = parts.next() {
        if part == marker {
            return parts.next().filter(|s| !s.is_empty());
        }
    }
    None
}

/// Typed, absent-tolerant field access on descriptors.
///
/// Empty strings, empty arrays and empty objects count as absent.
pub trait DescriptorExt {
    fn field(&self, key: &str) -> Option<&Json>;

    fn str_at(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(Json::as_str).filter(|s| !s.is_empty())
    }

    fn require_str(&self, key: &'static str) -> Result<&str, MissingField> {
        self.str_at(key).ok_or(MissingField(key))
    }

    fn bool_at(&self, key: &str) -> Option<bool> {
        self.field(key).and_then(Json::as_bool)
    }

    /// Set boolean flag (absent counts as false).
    fn is_set(&self, key: &str) -> bool {
        self.bool_at(key).unwrap_or(false)
    }

    /// Number, accepting numeric strings as the API sometimes returns them.
    fn number_at(&self, key: &str) -> Option<Number> {
        match self.field(key)? {
            Json::Number(n) => Some(n.clone()),
            Json::String(s) => s.parse::<i64>().ok().map(Number::from),
            _ => None,
        }
    }

    fn list_at(&self, key: &str) -> Option<&[Json]> {
        self.field(key)
            .and_then(Json::as_array)
            .map(Vec::as_slice)
            .filter(|items| !items.is_empty())
    }

    fn obj_at(&self, key: &str) -> Option<&Json> {
        self.field(key)
            .filter(|v| v.as_object().map(|m| !m.is_empty()).unwrap_or(false))
    }

    fn strings_at(&self, key: &str) -> Option<Value> {
        let items: Vec<&str> = self.list_at(key)?.iter().filter_map(Json::as_str).collect();
        if items.is_empty() {
            None
        } else {
            Some(Value::strings(items))
        }
    }

    fn map_at(&self, key: &str) -> Option<Value> {
        self.field(key)
            .and_then(Json::as_object)
            .filter(|m| !m.is_empty())
            .and_then(|_| self.field(key).and_then(Value::from_json))
    }

    /// First present string among several spellings of a field.
    fn first_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.str_at(k))
    }
}

impl DescriptorExt for Json {
    fn field(&self, key: &str) -> Option<&Json> {
        self.get(key).filter(|v| !v.is_null())
    }
}
