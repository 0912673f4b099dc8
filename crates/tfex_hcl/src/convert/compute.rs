//! Compute instances.

use super::{declare, last_segment, ConvertContext, ConvertResult, DescriptorExt, MissingField};
use crate::block::{Body, Value};
use crate::model::Descriptor;

pub fn instance(d: &Descriptor, ctx: &ConvertContext<'_>) -> ConvertResult {
    let name = d.require_str("name")?;
    let machine_type = d.require_str("machineType")?;

    let mut body = Body::new();
    body.attr("name", name)
        .opt("project", ctx.project)
        .opt("zone", d.str_at("zone").map(last_segment))
        .attr("machine_type", last_segment(machine_type))
        .opt("description", d.str_at("description"))
        .opt("tags", d.obj_at("tags").and_then(|t| t.strings_at("items")))
        .opt("labels", d.map_at("labels"))
        .flag("deletion_protection", d.is_set("deletionProtection"))
        .flag("can_ip_forward", d.is_set("canIpForward"));

    let disks = d.list_at("disks").unwrap_or_default();
    let boot = disks
        .iter()
        .find(|disk| disk.is_set("boot"))
        .ok_or(MissingField("disks.boot"))?;
    let mut boot_disk = Body::new();
    boot_disk
        .attr("auto_delete", boot.is_set("autoDelete"))
        .opt("device_name", boot.str_at("deviceName"))
        .attr("source", boot.require_str("source")?);
    body.nested("boot_disk", boot_disk);

    for disk in disks.iter().filter(|disk| !disk.is_set("boot")) {
        let mut attached = Body::new();
        attached
            .attr("source", disk.require_str("source")?)
            .opt("device_name", disk.str_at("deviceName"))
            .opt("mode", disk.str_at("mode"));
        body.nested("attached_disk", attached);
    }

    for nic in d.list_at("networkInterfaces").unwrap_or_default() {
        let mut interface = Body::new();
        interface
            .opt(
                "network",
                nic.str_at("network")
                    .map(|n| Value::reference("google_compute_network", last_segment(n), "id")),
            )
            .opt(
                "subnetwork",
                nic.str_at("subnetwork")
                    .map(|s| Value::reference("google_compute_subnetwork", last_segment(s), "id")),
            )
            .opt("network_ip", nic.str_at("networkIP"));
        for access in nic.list_at("accessConfigs").unwrap_or_default() {
            let mut access_config = Body::new();
            access_config
                .opt("nat_ip", access.str_at("natIP"))
                .opt("network_tier", access.str_at("networkTier"));
            interface.nested("access_config", access_config);
        }
        body.nested("network_interface", interface);
    }

    if let Some(account) = d.list_at("serviceAccounts").and_then(|accounts| accounts.first()) {
        let mut service_account = Body::new();
        service_account
            .opt("email", account.str_at("email"))
            .attr(
                "scopes",
                account.strings_at("scopes").unwrap_or_else(|| Value::List(Vec::new())),
            );
        body.nested("service_account", service_account);
    }

    if let Some(scheduling) = d.obj_at("scheduling") {
        let mut schedule = Body::new();
        schedule
            .opt("preemptible", scheduling.bool_at("preemptible"))
            .opt("automatic_restart", scheduling.bool_at("automaticRestart"))
            .opt("on_host_maintenance", scheduling.str_at("onHostMaintenance"))
            .opt("provisioning_model", scheduling.str_at("provisioningModel"));
        body.nested_opt("scheduling", schedule);
    }

    declare("google_compute_instance", name, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::Conversion;
    use serde_json::json;

    #[test]
    fn test_instance_disks_and_interfaces() {
        let d = json!({
            "name": "web-1",
            "zone": "https://www.googleapis.com/compute/v1/projects/p/zones/us-central1-a",
            "machineType": "https://www.googleapis.com/compute/v1/projects/p/zones/us-central1-a/machineTypes/e2-medium",
            "tags": {"items": ["web", "ssh"]},
            "disks": [
                {"boot": true, "autoDelete": true, "deviceName": "web-1", "source": "projects/p/zones/z/disks/web-1"},
                {"boot": false, "source": "projects/p/zones/z/disks/data", "mode": "READ_WRITE"}
            ],
            "networkInterfaces": [{
                "network": "projects/p/global/networks/default",
                "subnetwork": "projects/p/regions/us-central1/subnetworks/default",
                "accessConfigs": [{"name": "External NAT", "networkTier": "PREMIUM"}]
            }]
        });
        let Ok(Conversion::Declare(decl)) = instance(&d, &ConvertContext::project("p")) else {
            panic!("expected declaration");
        };

        assert_eq!(decl.body.get("machine_type"), Some(&Value::from("e2-medium")));
        assert_eq!(decl.body.get("zone"), Some(&Value::from("us-central1-a")));
        assert_eq!(decl.body.blocks("boot_disk").count(), 1);
        assert_eq!(decl.body.blocks("attached_disk").count(), 1);
        let nic = decl.body.blocks("network_interface").next().unwrap();
        assert_eq!(nic.body.blocks("access_config").count(), 1);
    }

    #[test]
    fn test_instance_without_boot_disk_is_malformed() {
        let d = json!({"name": "x", "machineType": "e2-small", "disks": []});
        assert_eq!(
            instance(&d, &ConvertContext::default()),
            Err(MissingField("disks.boot"))
        );
    }
}
