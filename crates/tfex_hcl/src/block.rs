//! Typed configuration tree.
//!
//! Converters build [`ConfigBlock`] values; the renderer turns them into
//! text. Blocks are immutable once built.

use serde_json::{Number, Value as Json};

use crate::redact::{is_sensitive, REDACTED};
use crate::sanitize::sanitize;

/// An attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(Number),
    Bool(bool),
    List(Vec<Value>),
    /// Ordered key/value pairs
    Map(Vec<(String, Value)>),
    /// Unquoted expression, e.g. `google_compute_network.default.id`
    Expression(String),
}

impl Value {
    /// Reference to an attribute of another resource by its raw name.
    pub fn reference(resource_type: &str, raw_name: &str, attribute: &str) -> Self {
        Value::Expression(format!("{}.{}.{}", resource_type, sanitize(raw_name), attribute))
    }

    /// Variable reference, e.g. `var.project_id`.
    pub fn var(name: &str) -> Self {
        Value::Expression(format!("var.{}", name))
    }

    /// Normalize an API duration such as `"60s"` or `"3.5s"` to seconds.
    pub fn duration_seconds(raw: &str) -> Option<Self> {
        let digits = raw.trim().strip_suffix('s').unwrap_or(raw.trim());
        if let Ok(n) = digits.parse::<i64>() {
            return Some(Value::Number(n.into()));
        }
        digits
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
    }

    /// Convert a JSON value; `null` has no counterpart.
    pub fn from_json(json: &Json) -> Option<Self> {
        match json {
            Json::Null => None,
            Json::Bool(b) => Some(Value::Bool(*b)),
            Json::Number(n) => Some(Value::Number(n.clone())),
            Json::String(s) => Some(Value::String(s.clone())),
            Json::Array(items) => Some(Value::List(items.iter().filter_map(Value::from_json).collect())),
            Json::Object(map) => Some(Value::Map(
                map.iter()
                    .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
                    .collect(),
            )),
        }
    }

    /// Copy with every map entry under a sensitive key replaced by the
    /// redaction marker, at any depth.
    pub fn redacted(self) -> Self {
        match self {
            Value::Map(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| {
                        let value = if is_sensitive(&key) {
                            Value::String(REDACTED.to_string())
                        } else {
                            value.redacted()
                        };
                        (key, value)
                    })
                    .collect(),
            ),
            Value::List(items) => Value::List(items.into_iter().map(Value::redacted).collect()),
            other => other,
        }
    }

    /// List of strings.
    pub fn strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::List(items.into_iter().map(|s| Value::String(s.into())).collect())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

/// One entry of a block body.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyItem {
    Attribute { name: String, value: Value },
    Block(ConfigBlock),
    Comment(String),
}

/// Ordered contents of a block.
///
/// Attributes keep insertion order; converters add fields in their
/// documented order. Sensitive attribute names always receive the
/// redaction marker, whatever value is passed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Body {
    items: Vec<BodyItem>,
}

impl Body {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute.
    pub fn attr(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        let value = if is_sensitive(name) {
            Value::String(REDACTED.to_string())
        } else {
            value.into().redacted()
        };
        self.items.push(BodyItem::Attribute {
            name: name.to_string(),
            value,
        });
        self
    }

    /// Add an attribute only when a value is present.
    pub fn opt<V: Into<Value>>(&mut self, name: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.attr(name, value);
        }
        self
    }

    /// Add `name = true` only when the flag is set.
    pub fn flag(&mut self, name: &str, set: bool) -> &mut Self {
        if set {
            self.attr(name, true);
        }
        self
    }

    /// Add a nested block.
    pub fn block(&mut self, block: ConfigBlock) -> &mut Self {
        self.items.push(BodyItem::Block(block));
        self
    }

    /// Add a nested block built from `body`.
    pub fn nested(&mut self, name: &str, body: Body) -> &mut Self {
        self.block(ConfigBlock::nested(name, body))
    }

    /// Add a nested block only when `body` has content.
    pub fn nested_opt(&mut self, name: &str, body: Body) -> &mut Self {
        if !body.is_empty() {
            self.nested(name, body);
        }
        self
    }

    /// Add a `# text` comment line.
    pub fn comment(&mut self, text: impl Into<String>) -> &mut Self {
        self.items.push(BodyItem::Comment(text.into()));
        self
    }

    pub fn items(&self) -> &[BodyItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up an attribute value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.items.iter().find_map(|item| match item {
            BodyItem::Attribute { name: n, value } if n == name => Some(value),
            _ => None,
        })
    }

    /// Nested blocks with the given type, in order.
    pub fn blocks<'a>(&'a self, block_type: &'a str) -> impl Iterator<Item = &'a ConfigBlock> + 'a {
        self.items.iter().filter_map(move |item| match item {
            BodyItem::Block(b) if b.block_type == block_type => Some(b),
            _ => None,
        })
    }
}

/// A block: `type "label" ... { body }`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigBlock {
    pub block_type: String,
    pub labels: Vec<String>,
    pub body: Body,
}

impl ConfigBlock {
    pub fn new(block_type: impl Into<String>, labels: Vec<String>, body: Body) -> Self {
        Self {
            block_type: block_type.into(),
            labels,
            body,
        }
    }

    /// `resource "<type>" "<identifier>" { ... }`
    pub fn resource(resource_type: &str, identifier: &str, body: Body) -> Self {
        Self::new("resource", vec![resource_type.to_string(), identifier.to_string()], body)
    }

    /// `data "<type>" "<identifier>" { ... }`
    pub fn data(data_type: &str, identifier: &str, body: Body) -> Self {
        Self::new("data", vec![data_type.to_string(), identifier.to_string()], body)
    }

    /// Unlabelled nested block such as `allow { ... }`.
    pub fn nested(name: &str, body: Body) -> Self {
        Self::new(name, Vec::new(), body)
    }

    /// Identifier label of a resource or data block.
    pub fn identifier(&self) -> Option<&str> {
        self.labels.get(1).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_redacts_sensitive_attributes() {
        let mut body = Body::new();
        body.attr("shared_secret", "hunter2").attr("peer_ip", "1.2.3.4");

        assert_eq!(body.get("shared_secret"), Some(&Value::from(REDACTED)));
        assert_eq!(body.get("peer_ip"), Some(&Value::from("1.2.3.4")));
    }

    #[test]
    fn test_body_redacts_sensitive_map_keys() {
        let labels = Value::from_json(&json!({
            "env": "prod",
            "db_password": "hunter2",
            "nested": {"apiToken": "tok123"}
        }))
        .unwrap();
        let mut body = Body::new();
        body.attr("labels", labels);

        assert_eq!(
            body.get("labels"),
            Some(&Value::Map(vec![
                ("db_password".to_string(), Value::from(REDACTED)),
                ("env".to_string(), Value::from("prod")),
                (
                    "nested".to_string(),
                    Value::Map(vec![("apiToken".to_string(), Value::from(REDACTED))])
                ),
            ]))
        );
    }

    #[test]
    fn test_body_optional_attributes_omitted() {
        let mut body = Body::new();
        body.opt("description", None::<&str>).flag("disabled", false);
        assert!(body.is_empty());
    }

    #[test]
    fn test_duration_seconds() {
        assert_eq!(Value::duration_seconds("60s"), Some(Value::from(60i64)));
        assert_eq!(Value::duration_seconds("540"), Some(Value::from(540i64)));
        assert_eq!(
            Value::duration_seconds("3.5s"),
            Some(Value::Number(Number::from_f64(3.5).unwrap()))
        );
        assert_eq!(Value::duration_seconds("soon"), None);
    }

    #[test]
    fn test_reference_sanitizes_name() {
        assert_eq!(
            Value::reference("google_compute_network", "prod-vpc", "id"),
            Value::Expression("google_compute_network.prod_vpc.id".to_string())
        );
    }

    #[test]
    fn test_from_json_drops_nulls() {
        let value = Value::from_json(&json!({"env": "prod", "owner": null})).unwrap();
        assert_eq!(value, Value::Map(vec![("env".to_string(), Value::from("prod"))]));
    }
}
