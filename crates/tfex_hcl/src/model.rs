//! Run-scoped collection of extracted descriptors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::redact::redact_json;

/// One resource instance exactly as the upstream service described it.
pub type Descriptor = Json;

/// Resource-kind key to ordered descriptors.
///
/// Each kind is written once, by the routine that owns it; later writes
/// to the same key are appended in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntermediateModel {
    kinds: BTreeMap<String, Vec<Descriptor>>,
}

impl IntermediateModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append descriptors under `kind`.
    pub fn extend(&mut self, kind: &str, descriptors: Vec<Descriptor>) {
        self.kinds.entry(kind.to_string()).or_default().extend(descriptors);
    }

    /// Descriptors for `kind` (empty when never extracted).
    pub fn get(&self, kind: &str) -> &[Descriptor] {
        self.kinds.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `kind` was extracted at all.
    pub fn contains(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }

    pub fn count(&self, kind: &str) -> usize {
        self.get(kind).len()
    }

    /// Extracted kinds in key order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }

    /// Per-kind descriptor counts.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.kinds.iter().map(|(k, v)| (k.clone(), v.len())).collect()
    }

    pub fn total(&self) -> usize {
        self.kinds.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Structured dump with secrets redacted and keys sorted.
    pub fn to_dump(&self) -> Json {
        let map = self
            .kinds
            .iter()
            .map(|(k, v)| (k.clone(), Json::Array(v.iter().map(redact_json).collect())))
            .collect();
        Json::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_model_extend_and_counts() {
        let mut model = IntermediateModel::new();
        model.extend("networks", vec![json!({"name": "a"})]);
        model.extend("networks", vec![json!({"name": "b"})]);
        model.extend("subnets", Vec::new());

        assert_eq!(model.count("networks"), 2);
        assert!(model.contains("subnets"));
        assert_eq!(model.count("subnets"), 0);
        assert!(!model.contains("firewalls"));
        assert_eq!(model.get("networks")[1]["name"], "b");
        assert_eq!(model.total(), 2);
    }

    #[test]
    fn test_dump_redacts() {
        let mut model = IntermediateModel::new();
        model.extend("vpn_tunnels", vec![json!({"name": "t", "sharedSecret": "s3cr3t"})]);

        let dump = model.to_dump().to_string();
        assert!(!dump.contains("s3cr3t"));
        assert!(dump.contains("vpn_tunnels"));
    }
}
