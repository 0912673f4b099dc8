//! VPC networking: networks, subnets, firewalls, routes, routers, VPN and
//! peerings.

use serde_json::Value as Json;

use super::{declare, last_segment, ConvertContext, ConvertResult, Conversion, DescriptorExt, MissingField};
use crate::block::{Body, Value};
use crate::model::Descriptor;

/// `network` field of a descriptor as a reference to the declared network.
fn network_ref(d: &Descriptor) -> Result<Value, MissingField> {
    let network = d.require_str("network")?;
    Ok(Value::reference("google_compute_network", last_segment(network), "id"))
}

fn region(d: &Descriptor) -> Option<&str> {
    d.str_at("region").map(last_segment)
}

pub fn network(d: &Descriptor, ctx: &ConvertContext<'_>) -> ConvertResult {
    let name = d.require_str("name")?;

    let mut body = Body::new();
    body.attr("name", name)
        .opt("project", ctx.project)
        .attr("auto_create_subnetworks", d.is_set("autoCreateSubnetworks"))
        .opt("description", d.str_at("description"))
        .opt(
            "routing_mode",
            d.obj_at("routingConfig").and_then(|r| r.str_at("routingMode")),
        )
        .opt("mtu", d.number_at("mtu"))
        .flag("enable_ula_internal_ipv6", d.is_set("enableUlaInternalIpv6"))
        .opt("internal_ipv6_range", d.str_at("internalIpv6Range"));

    declare("google_compute_network", name, body)
}

pub fn subnet(d: &Descriptor, ctx: &ConvertContext<'_>) -> ConvertResult {
    let name = d.require_str("name")?;
    let cidr = d.require_str("ipCidrRange")?;
    let network = network_ref(d)?;

    let mut body = Body::new();
    body.attr("name", name)
        .opt("project", ctx.project)
        .attr("ip_cidr_range", cidr)
        .opt("region", region(d))
        .attr("network", network)
        .opt("description", d.str_at("description"))
        .opt("purpose", d.str_at("purpose"))
        .opt("role", d.str_at("role"))
        .flag("private_ip_google_access", d.is_set("privateIpGoogleAccess"))
        .opt("private_ipv6_google_access", d.str_at("privateIpv6GoogleAccess"))
        .opt("stack_type", d.str_at("stackType"))
        .opt("ipv6_access_type", d.str_at("ipv6AccessType"));

    for range in d.list_at("secondaryIpRanges").unwrap_or_default() {
        let mut secondary = Body::new();
        secondary
            .attr("range_name", range.require_str("rangeName")?)
            .attr("ip_cidr_range", range.require_str("ipCidrRange")?);
        body.nested("secondary_ip_range", secondary);
    }

    if let Some(log) = d.obj_at("logConfig").filter(|l| l.is_set("enable")) {
        let mut log_config = Body::new();
        log_config
            .attr(
                "aggregation_interval",
                log.str_at("aggregationInterval").unwrap_or("INTERVAL_5_SEC"),
            )
            .opt(
                "flow_sampling",
                serde_json::Number::from_f64(log.field("flowSampling").and_then(Json::as_f64).unwrap_or(0.5)),
            )
            .attr("metadata", log.str_at("metadata").unwrap_or("INCLUDE_ALL_METADATA"))
            .opt("metadata_fields", log.strings_at("metadataFields"))
            .opt("filter_expr", log.str_at("filterExpr"));
        body.nested("log_config", log_config);
    }

    declare("google_compute_subnetwork", name, body)
}

/// `allow`/`deny` entries: protocol then ports.
fn rule_blocks(body: &mut Body, block: &str, entries: &[Json]) {
    for entry in entries {
        let mut rule = Body::new();
        rule.attr("protocol", entry.str_at("IPProtocol").unwrap_or("tcp"))
            .opt("ports", entry.strings_at("ports"));
        body.nested(block, rule);
    }
}

pub fn firewall(d: &Descriptor, ctx: &ConvertContext<'_>) -> ConvertResult {
    let name = d.require_str("name")?;
    let network = network_ref(d)?;

    let mut body = Body::new();
    body.attr("name", name)
        .opt("project", ctx.project)
        .attr("network", network)
        .opt("description", d.str_at("description"))
        .opt("direction", d.str_at("direction"))
        .opt("priority", d.number_at("priority"))
        .flag("disabled", d.is_set("disabled"))
        .opt("source_ranges", d.strings_at("sourceRanges"))
        .opt("source_tags", d.strings_at("sourceTags"))
        .opt("source_service_accounts", d.strings_at("sourceServiceAccounts"))
        .opt("destination_ranges", d.strings_at("destinationRanges"))
        .opt("target_tags", d.strings_at("targetTags"))
        .opt("target_service_accounts", d.strings_at("targetServiceAccounts"));

    rule_blocks(&mut body, "allow", d.list_at("allowed").unwrap_or_default());
    rule_blocks(&mut body, "deny", d.list_at("denied").unwrap_or_default());

    if let Some(log) = d.obj_at("logConfig").filter(|l| l.is_set("enable")) {
        let mut log_config = Body::new();
        log_config.attr("metadata", log.str_at("metadata").unwrap_or("INCLUDE_ALL_METADATA"));
        body.nested("log_config", log_config);
    }

    declare("google_compute_firewall", name, body)
}

pub fn route(d: &Descriptor, ctx: &ConvertContext<'_>) -> ConvertResult {
    let name = d.require_str("name")?;
    if name.starts_with("default-route-") {
        return Ok(Conversion::Skip("default route managed by the platform"));
    }
    if d.str_at("nextHopPeering").is_some() {
        return Ok(Conversion::Skip("route imported through peering"));
    }
    let dest_range = d.require_str("destRange")?;
    let network = network_ref(d)?;

    let mut body = Body::new();
    body.attr("name", name)
        .opt("project", ctx.project)
        .attr("dest_range", dest_range)
        .attr("network", network)
        .opt("description", d.str_at("description"))
        .opt("priority", d.number_at("priority"))
        .opt("tags", d.strings_at("tags"))
        .opt("next_hop_gateway", d.str_at("nextHopGateway").map(last_segment))
        .opt("next_hop_ip", d.str_at("nextHopIp"))
        .opt("next_hop_instance", d.str_at("nextHopInstance"))
        .opt("next_hop_vpn_tunnel", d.str_at("nextHopVpnTunnel"))
        .opt("next_hop_ilb", d.str_at("nextHopIlb"));

    declare("google_compute_route", name, body)
}

pub fn router(d: &Descriptor, ctx: &ConvertContext<'_>) -> ConvertResult {
    let name = d.require_str("name")?;
    let network = network_ref(d)?;

    let mut body = Body::new();
    body.attr("name", name)
        .opt("project", ctx.project)
        .opt("region", region(d))
        .attr("network", network)
        .opt("description", d.str_at("description"));

    if let Some(bgp) = d.obj_at("bgp") {
        let mut bgp_body = Body::new();
        bgp_body
            .attr("asn", bgp.number_at("asn").map(Value::from).unwrap_or_else(|| Value::from(64512i64)))
            .opt("advertise_mode", bgp.str_at("advertiseMode"))
            .opt("advertised_groups", bgp.strings_at("advertisedGroups"))
            .opt("keepalive_interval", bgp.number_at("keepaliveInterval"));
        for range in bgp.list_at("advertisedIpRanges").unwrap_or_default() {
            let mut advertised = Body::new();
            advertised
                .attr("range", range.require_str("range")?)
                .opt("description", range.str_at("description"));
            bgp_body.nested("advertised_ip_ranges", advertised);
        }
        body.nested("bgp", bgp_body);
    }

    declare("google_compute_router", name, body)
}

pub fn vpn_gateway(d: &Descriptor, ctx: &ConvertContext<'_>) -> ConvertResult {
    let name = d.require_str("name")?;
    let network = network_ref(d)?;

    let mut body = Body::new();
    body.attr("name", name)
        .opt("project", ctx.project)
        .opt("region", region(d))
        .attr("network", network)
        .opt("description", d.str_at("description"))
        .opt("stack_type", d.str_at("stackType"));

    declare("google_compute_ha_vpn_gateway", name, body)
}

pub fn vpn_tunnel(d: &Descriptor, ctx: &ConvertContext<'_>) -> ConvertResult {
    let name = d.require_str("name")?;

    let mut body = Body::new();
    body.attr("name", name)
        .opt("project", ctx.project)
        .opt("region", region(d))
        .opt("description", d.str_at("description"))
        .opt("peer_ip", d.str_at("peerIp"));

    if d.str_at("sharedSecret").is_some() || d.str_at("sharedSecretHash").is_some() {
        body.comment("Pre-shared key is not exported; supply it before applying")
            .attr("shared_secret", Value::String(String::new()));
    }

    body.opt("ike_version", d.number_at("ikeVersion"))
        .opt(
            "vpn_gateway",
            d.str_at("vpnGateway")
                .map(|g| Value::reference("google_compute_ha_vpn_gateway", last_segment(g), "id")),
        )
        .opt("vpn_gateway_interface", d.number_at("vpnGatewayInterface"))
        .opt("peer_external_gateway", d.str_at("peerExternalGateway"))
        .opt("peer_external_gateway_interface", d.number_at("peerExternalGatewayInterface"))
        .opt("peer_gcp_gateway", d.str_at("peerGcpGateway"))
        .opt(
            "router",
            d.str_at("router")
                .map(|r| Value::reference("google_compute_router", last_segment(r), "name")),
        )
        .opt("local_traffic_selector", d.strings_at("localTrafficSelector"))
        .opt("remote_traffic_selector", d.strings_at("remoteTrafficSelector"));

    declare("google_compute_vpn_tunnel", name, body)
}

/// Peering entry derived from a network: `{"network": <name>, "peering": {...}}`.
pub fn peering(d: &Descriptor, _ctx: &ConvertContext<'_>) -> ConvertResult {
    let network = d.require_str("network")?;
    let peer = d.obj_at("peering").ok_or(MissingField("peering"))?;
    let name = peer.require_str("name")?;
    let peer_network = peer.require_str("network")?;

    let mut body = Body::new();
    body.attr("name", name)
        .attr(
            "network",
            Value::reference("google_compute_network", last_segment(network), "self_link"),
        )
        .attr("peer_network", peer_network)
        .flag("export_custom_routes", peer.is_set("exportCustomRoutes"))
        .flag("import_custom_routes", peer.is_set("importCustomRoutes"))
        .flag(
            "export_subnet_routes_with_public_ip",
            peer.is_set("exportSubnetRoutesWithPublicIp"),
        )
        .flag(
            "import_subnet_routes_with_public_ip",
            peer.is_set("importSubnetRoutesWithPublicIp"),
        )
        .opt("stack_type", peer.str_at("stackType"));

    declare(
        "google_compute_network_peering",
        &format!("{}_{}", last_segment(network), name),
        body,
    )
}
