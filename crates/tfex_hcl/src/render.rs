//! Configuration-tree renderer.
//!
//! One renderer shapes all text: quoting, escaping, indentation and the
//! terraform-fmt style alignment of `=` within runs of attributes.

use crate::block::{BodyItem, ConfigBlock, Value};

const INDENT: &str = "  ";

/// Lists longer than this are written one element per line.
const MAX_INLINE_LIST: usize = 80;

/// Escape a string for use inside a double-quoted literal.
///
/// Template sequences are escaped too, so `${` and `%{` in source data
/// never become interpolations.
pub fn escape_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' if chars.peek() == Some(&'{') => out.push_str("$$"),
            '%' if chars.peek() == Some(&'{') => out.push_str("%%"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Quote and escape a string literal.
pub fn quote(raw: &str) -> String {
    format!("\"{}\"", escape_string(raw))
}

fn is_bare_key(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn render_key(key: &str) -> String {
    if is_bare_key(key) {
        key.to_string()
    } else {
        quote(key)
    }
}

/// Render a complete top-level block, ending with a newline.
pub fn render_block(block: &ConfigBlock) -> String {
    let mut out = String::new();
    write_block(&mut out, block, 0);
    out
}

fn write_block(out: &mut String, block: &ConfigBlock, depth: usize) {
    let pad = INDENT.repeat(depth);
    out.push_str(&pad);
    out.push_str(&block.block_type);
    for label in &block.labels {
        out.push(' ');
        out.push_str(&quote(label));
    }

    let items = block.body.items();
    if items.is_empty() {
        out.push_str(" {}\n");
        return;
    }
    out.push_str(" {\n");

    let inner = INDENT.repeat(depth + 1);
    let mut i = 0;
    while i < items.len() {
        match &items[i] {
            BodyItem::Attribute { .. } => {
                let start = i;
                while i < items.len() && matches!(items[i], BodyItem::Attribute { .. }) {
                    i += 1;
                }
                if start > 0 {
                    out.push('\n');
                }
                write_attribute_run(out, &items[start..i], depth + 1);
            }
            BodyItem::Block(nested) => {
                if i > 0 && !matches!(items[i - 1], BodyItem::Comment(_)) {
                    out.push('\n');
                }
                write_block(out, nested, depth + 1);
                i += 1;
            }
            BodyItem::Comment(text) => {
                if i > 0 && !matches!(items[i - 1], BodyItem::Comment(_)) {
                    out.push('\n');
                }
                out.push_str(&inner);
                out.push_str("# ");
                out.push_str(&text.replace(['\n', '\r'], " "));
                out.push('\n');
                i += 1;
                // A comment annotates what follows it directly.
                if i < items.len() {
                    if let BodyItem::Attribute { .. } = items[i] {
                        let start = i;
                        while i < items.len() && matches!(items[i], BodyItem::Attribute { .. }) {
                            i += 1;
                        }
                        write_attribute_run(out, &items[start..i], depth + 1);
                    }
                }
            }
        }
    }

    out.push_str(&pad);
    out.push_str("}\n");
}

fn write_attribute_run(out: &mut String, run: &[BodyItem], depth: usize) {
    let width = run
        .iter()
        .filter_map(|item| match item {
            BodyItem::Attribute { name, .. } => Some(name.len()),
            _ => None,
        })
        .max()
        .unwrap_or(0);

    let pad = INDENT.repeat(depth);
    for item in run {
        if let BodyItem::Attribute { name, value } = item {
            out.push_str(&pad);
            out.push_str(&format!("{:<width$} = ", name, width = width));
            write_value(out, value, depth);
            out.push('\n');
        }
    }
}

fn write_value(out: &mut String, value: &Value, depth: usize) {
    match value {
        Value::String(s) => out.push_str(&quote(s)),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Expression(e) => out.push_str(e),
        Value::List(items) => {
            let mut inline = String::from("[");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    inline.push_str(", ");
                }
                write_value(&mut inline, item, depth);
            }
            inline.push(']');
            let multiline = items.iter().any(|v| matches!(v, Value::Map(m) if !m.is_empty()))
                || (items.len() > 1 && inline.len() > MAX_INLINE_LIST);
            if !multiline {
                out.push_str(&inline);
            } else {
                let pad = INDENT.repeat(depth + 1);
                out.push_str("[\n");
                for item in items {
                    out.push_str(&pad);
                    write_value(out, item, depth + 1);
                    out.push_str(",\n");
                }
                out.push_str(&INDENT.repeat(depth));
                out.push(']');
            }
        }
        Value::Map(entries) => {
            if entries.is_empty() {
                out.push_str("{}");
                return;
            }
            let keys: Vec<String> = entries.iter().map(|(k, _)| render_key(k)).collect();
            let width = keys.iter().map(String::len).max().unwrap_or(0);
            let pad = INDENT.repeat(depth + 1);
            out.push_str("{\n");
            for (key, (_, v)) in keys.iter().zip(entries) {
                out.push_str(&pad);
                out.push_str(&format!("{:<width$} = ", key, width = width));
                write_value(out, v, depth + 1);
                out.push('\n');
            }
            out.push_str(&INDENT.repeat(depth));
            out.push('}');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Body;

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(escape_string("a\\b"), "a\\\\b");
        assert_eq!(escape_string("line1\nline2\ttab"), "line1\\nline2\\ttab");
        assert_eq!(escape_string("${var.x} and %{if}"), "$${var.x} and %%{if}");
        assert_eq!(escape_string("cost $5 or 50%"), "cost $5 or 50%");
        assert_eq!(escape_string("bell\u{7}"), "bell\\u0007");
    }

    #[test]
    fn test_render_aligned_attributes() {
        let mut body = Body::new();
        body.attr("name", "default").attr("auto_create_subnetworks", false).attr("mtu", 1460i64);
        let text = render_block(&ConfigBlock::resource("google_compute_network", "default", body));

        assert_eq!(
            text,
            "resource \"google_compute_network\" \"default\" {\n  name                    = \"default\"\n  auto_create_subnetworks = false\n  mtu                     = 1460\n}\n"
        );
    }

    #[test]
    fn test_render_nested_blocks_in_order() {
        let mut first = Body::new();
        first.attr("protocol", "tcp").attr("ports", Value::strings(["22"]));
        let mut second = Body::new();
        second.attr("protocol", "tcp").attr("ports", Value::strings(["443"]));

        let mut body = Body::new();
        body.attr("name", "allow-web").nested("allow", first).nested("allow", second);
        let text = render_block(&ConfigBlock::resource("google_compute_firewall", "allow_web", body));

        let expected = "resource \"google_compute_firewall\" \"allow_web\" {\n  name = \"allow-web\"\n\n  allow {\n    protocol = \"tcp\"\n    ports    = [\"22\"]\n  }\n\n  allow {\n    protocol = \"tcp\"\n    ports    = [\"443\"]\n  }\n}\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_render_map_and_empty_block() {
        let mut body = Body::new();
        body.attr(
            "labels",
            Value::Map(vec![
                ("env".to_string(), Value::from("prod")),
                ("team.name".to_string(), Value::from("net")),
            ]),
        );
        let text = render_block(&ConfigBlock::resource("google_storage_bucket", "b", body));
        assert!(text.contains("  labels = {\n    env         = \"prod\"\n    \"team.name\" = \"net\"\n  }\n"));

        let empty = render_block(&ConfigBlock::new("provider", vec!["google".to_string()], Body::new()));
        assert_eq!(empty, "provider \"google\" {}\n");
    }

    #[test]
    fn test_render_comment_before_attribute() {
        let mut body = Body::new();
        body.attr("name", "t1").comment("Set via a secure variable").attr("shared_secret", "x");
        let text = render_block(&ConfigBlock::resource("google_compute_vpn_tunnel", "t1", body));
        assert!(text.contains("  name = \"t1\"\n\n  # Set via a secure variable\n  shared_secret = \"<REDACTED>\"\n"));
        assert!(!text.contains("\"x\""));
    }

    #[test]
    fn test_render_long_list_wraps() {
        let members: Vec<String> = (1..=4).map(|i| format!("user:someone{}@example.com", i)).collect();
        let mut body = Body::new();
        body.attr("role", "roles/viewer").attr("members", Value::strings(members));
        let text = render_block(&ConfigBlock::resource("google_organization_iam_binding", "viewer", body));
        assert!(text.contains("  members = [\n    \"user:someone1@example.com\",\n"));
        assert!(text.contains("    \"user:someone4@example.com\",\n  ]\n"));
    }
}
