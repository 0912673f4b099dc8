//! Service accounts.

use super::{declare, ConvertContext, ConvertResult, Conversion, DescriptorExt};
use crate::block::Body;
use crate::model::Descriptor;

/// Only user-managed accounts are declared; default compute and App
/// Engine accounts belong to the platform.
pub fn service_account(d: &Descriptor, ctx: &ConvertContext<'_>) -> ConvertResult {
    let email = d.require_str("email")?;
    if !email.ends_with(".iam.gserviceaccount.com") {
        return Ok(Conversion::Skip("service account managed by the platform"));
    }
    let account_id = email.split('@').next().unwrap_or(email);

    let mut body = Body::new();
    body.attr("account_id", account_id)
        .opt("project", ctx.project)
        .attr("display_name", d.str_at("displayName").unwrap_or(account_id))
        .opt("description", d.str_at("description"))
        .flag("disabled", d.is_set("disabled"));

    declare("google_service_account", account_id, body)
}
