//! Secret redaction.

use serde_json::Value as Json;

/// Marker substituted for every sensitive value.
pub const REDACTED: &str = "<REDACTED>";

/// Normalized field names that always carry secret material.
const SENSITIVE_NAMES: &[&str] = &[
    "sharedsecret",
    "sharedsecrethash",
    "password",
    "rootpassword",
    "privatekey",
    "privatekeydata",
    "clientkey",
    "presharedkey",
    "secret",
    "token",
    "credentials",
];

/// Normalized suffixes that mark a field as sensitive.
const SENSITIVE_SUFFIXES: &[&str] = &["secret", "password", "privatekey", "token"];

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Whether a field or attribute name holds secret material.
///
/// Works for both API (`sharedSecret`) and Terraform (`shared_secret`)
/// spellings.
pub fn is_sensitive(name: &str) -> bool {
    let normalized = normalize(name);
    SENSITIVE_NAMES.contains(&normalized.as_str())
        || SENSITIVE_SUFFIXES.iter().any(|s| normalized.ends_with(s))
}

/// Copy of `value` with every sensitive field replaced by [`REDACTED`].
pub fn redact_json(value: &Json) -> Json {
    match value {
        Json::Object(map) => Json::Object(
            map.iter()
                .map(|(key, v)| {
                    let v = if is_sensitive(key) && !v.is_null() {
                        Json::String(REDACTED.to_string())
                    } else {
                        redact_json(v)
                    };
                    (key.clone(), v)
                })
                .collect(),
        ),
        Json::Array(items) => Json::Array(items.iter().map(redact_json).collect()),
        other => other.clone(),
    }
}
