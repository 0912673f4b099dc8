//! Organization hierarchy: folders, policies, IAM bindings and tags.

use super::{declare, last_segment, ConvertContext, ConvertResult, DescriptorExt, MissingField};
use crate::block::{Body, Value};
use crate::model::Descriptor;

pub fn folder(d: &Descriptor, _ctx: &ConvertContext<'_>) -> ConvertResult {
    let display_name = d.require_str("displayName")?;
    let parent = d.require_str("parent")?;

    let mut body = Body::new();
    body.attr("display_name", display_name).attr("parent", parent);

    declare("google_folder", display_name, body)
}

/// Organization policy from `org-policies describe`.
pub fn org_policy(d: &Descriptor, ctx: &ConvertContext<'_>) -> ConvertResult {
    let constraint = d.require_str("constraint")?;
    let org_id = ctx.organization.ok_or(MissingField("organization"))?;

    let mut body = Body::new();
    body.attr("org_id", org_id).attr("constraint", constraint);

    if let Some(boolean) = d.obj_at("booleanPolicy") {
        let mut boolean_policy = Body::new();
        boolean_policy.attr("enforced", boolean.is_set("enforced"));
        body.nested("boolean_policy", boolean_policy);
    } else if let Some(list) = d.obj_at("listPolicy") {
        let mut list_policy = Body::new();
        list_policy
            .flag("inherit_from_parent", list.is_set("inheritFromParent"))
            .opt("suggested_value", list.str_at("suggestedValue"));

        match list.str_at("allValues") {
            Some("ALLOW") => {
                let mut allow = Body::new();
                allow.attr("all", true);
                list_policy.nested("allow", allow);
            }
            Some("DENY") => {
                let mut deny = Body::new();
                deny.attr("all", true);
                list_policy.nested("deny", deny);
            }
            _ => {
                if let Some(values) = list.strings_at("allowedValues") {
                    let mut allow = Body::new();
                    allow.attr("values", values);
                    list_policy.nested("allow", allow);
                }
                if let Some(values) = list.strings_at("deniedValues") {
                    let mut deny = Body::new();
                    deny.attr("values", values);
                    list_policy.nested("deny", deny);
                }
            }
        }
        body.nested("list_policy", list_policy);
    } else if d.field("restoreDefault").is_some() {
        let mut restore = Body::new();
        restore.attr("default", true);
        body.nested("restore_policy", restore);
    }

    declare("google_organization_policy", last_segment(constraint), body)
}

/// One binding expanded from the organization IAM policy.
pub fn org_iam_binding(d: &Descriptor, ctx: &ConvertContext<'_>) -> ConvertResult {
    let role = d.require_str("role")?;
    let members = d.strings_at("members").ok_or(MissingField("members"))?;
    let org_id = ctx.organization.ok_or(MissingField("organization"))?;

    let mut body = Body::new();
    body.attr("org_id", org_id).attr("role", role).attr("members", members);

    if let Some(condition) = d.obj_at("condition") {
        let mut cond = Body::new();
        cond.attr("title", condition.require_str("title")?)
            .opt("description", condition.str_at("description"))
            .attr("expression", condition.require_str("expression")?);
        body.nested("condition", cond);
    }

    let hint = role.strip_prefix("roles/").unwrap_or(role);
    declare("google_organization_iam_binding", hint, body)
}

pub fn tag_key(d: &Descriptor, ctx: &ConvertContext<'_>) -> ConvertResult {
    let short_name = d.require_str("shortName")?;
    let parent = d
        .str_at("parent")
        .map(str::to_string)
        .or_else(|| ctx.organization.map(|org| format!("organizations/{}", org)))
        .ok_or(MissingField("parent"))?;

    let mut body = Body::new();
    body.attr("parent", parent)
        .attr("short_name", short_name)
        .opt("description", d.str_at("description"))
        .opt("purpose", d.str_at("purpose"));

    declare("google_tags_tag_key", short_name, body)
}

/// Tag value; the parent key is referenced by the short name found in the
/// value's namespaced name (`<org>/<key>/<value>`).
pub fn tag_value(d: &Descriptor, _ctx: &ConvertContext<'_>) -> ConvertResult {
    let short_name = d.require_str("shortName")?;
    let parent = d.require_str("parent")?;

    let key_name = d
        .str_at("namespacedName")
        .and_then(|n| n.split('/').nth(1))
        .filter(|k| !k.is_empty());

    let (parent_value, key_hint) = match key_name {
        Some(key) => (Value::reference("google_tags_tag_key", key, "name"), key),
        None => (Value::from(parent), last_segment(parent)),
    };

    let mut body = Body::new();
    body.attr("parent", parent_value)
        .attr("short_name", short_name)
        .opt("description", d.str_at("description"));

    declare("google_tags_tag_value", &format!("{}_{}", key_hint, short_name), body)
}
