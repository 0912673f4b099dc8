//! Managed services: storage, functions, GKE, Cloud SQL and Pub/Sub.

use super::{
    declare, last_segment, segment_after, ConvertContext, ConvertResult, DescriptorExt,
    MissingField,
};
use crate::block::{Body, Value};
use crate::model::Descriptor;

/// Buckets come from `gcloud storage buckets list`, which reports
/// snake_case fields; the JSON API spelling is accepted too.
pub fn bucket(d: &Descriptor, ctx: &ConvertContext<'_>) -> ConvertResult {
    let name = d.require_str("name")?;

    let uniform = d.is_set("uniform_bucket_level_access")
        || d.obj_at("iamConfiguration")
            .and_then(|c| c.obj_at("uniformBucketLevelAccess"))
            .map(|u| u.is_set("enabled"))
            .unwrap_or(false);
    let versioned = d.is_set("versioning_enabled")
        || d.obj_at("versioning").map(|v| v.is_set("enabled")).unwrap_or(false);

    let mut body = Body::new();
    body.attr("name", name)
        .opt("project", ctx.project)
        .attr("location", d.str_at("location").unwrap_or("US"))
        .opt(
            "storage_class",
            d.first_str(&["default_storage_class", "storageClass"]),
        )
        .flag("uniform_bucket_level_access", uniform)
        .opt(
            "public_access_prevention",
            d.first_str(&["public_access_prevention", "publicAccessPrevention"]),
        )
        .opt("labels", d.map_at("labels"));

    if versioned {
        let mut versioning = Body::new();
        versioning.attr("enabled", true);
        body.nested("versioning", versioning);
    }

    declare("google_storage_bucket", name, body)
}

/// Second-generation function. First-generation descriptors are mapped
/// onto the same shape.
pub fn function(d: &Descriptor, ctx: &ConvertContext<'_>) -> ConvertResult {
    let full_name = d.require_str("name")?;
    let name = last_segment(full_name);

    let mut body = Body::new();
    body.attr("name", name)
        .opt("project", ctx.project)
        .opt("location", segment_after(full_name, "locations"))
        .opt("description", d.str_at("description"))
        .opt("labels", d.map_at("labels"));

    let build = d.obj_at("buildConfig");
    let mut build_config = Body::new();
    build_config
        .opt(
            "runtime",
            build.and_then(|b| b.str_at("runtime")).or_else(|| d.str_at("runtime")),
        )
        .opt(
            "entry_point",
            build
                .and_then(|b| b.str_at("entryPoint"))
                .or_else(|| d.str_at("entryPoint")),
        );
    body.nested_opt("build_config", build_config);

    let service = d.obj_at("serviceConfig");
    let timeout = service
        .and_then(|s| s.number_at("timeoutSeconds"))
        .map(Value::Number)
        .or_else(|| d.str_at("timeout").and_then(Value::duration_seconds));
    let memory = service
        .and_then(|s| s.str_at("availableMemory"))
        .map(str::to_string)
        .or_else(|| d.number_at("availableMemoryMb").map(|mb| format!("{}M", mb)));

    let mut service_config = Body::new();
    service_config
        .opt("available_memory", memory)
        .opt("timeout_seconds", timeout)
        .opt("max_instance_count", service.and_then(|s| s.number_at("maxInstanceCount")))
        .opt("min_instance_count", service.and_then(|s| s.number_at("minInstanceCount")))
        .opt(
            "service_account_email",
            service
                .and_then(|s| s.str_at("serviceAccountEmail"))
                .or_else(|| d.str_at("serviceAccountEmail")),
        )
        .opt(
            "ingress_settings",
            service
                .and_then(|s| s.str_at("ingressSettings"))
                .or_else(|| d.str_at("ingressSettings")),
        );
    body.nested_opt("service_config", service_config);

    declare("google_cloudfunctions2_function", name, body)
}

pub fn gke_cluster(d: &Descriptor, ctx: &ConvertContext<'_>) -> ConvertResult {
    let name = d.require_str("name")?;
    let location = d.require_str("location")?;

    let mut body = Body::new();
    body.attr("name", name)
        .opt("project", ctx.project)
        .attr("location", location)
        .opt("description", d.str_at("description"))
        .opt("network", d.str_at("network"))
        .opt("subnetwork", d.str_at("subnetwork"))
        .opt(
            "networking_mode",
            d.obj_at("ipAllocationPolicy")
                .filter(|p| p.is_set("useIpAliases"))
                .map(|_| "VPC_NATIVE"),
        )
        .opt("resource_labels", d.map_at("resourceLabels"))
        .comment("Node pools are declared as separate google_container_node_pool resources")
        .attr("remove_default_node_pool", true)
        .attr("initial_node_count", 1i64);

    if let Some(policy) = d.obj_at("ipAllocationPolicy").filter(|p| p.is_set("useIpAliases")) {
        let mut ip_allocation = Body::new();
        ip_allocation
            .opt("cluster_secondary_range_name", policy.str_at("clusterSecondaryRangeName"))
            .opt("services_secondary_range_name", policy.str_at("servicesSecondaryRangeName"));
        body.nested("ip_allocation_policy", ip_allocation);
    }

    if let Some(private) = d.obj_at("privateClusterConfig") {
        let mut private_config = Body::new();
        private_config
            .flag("enable_private_nodes", private.is_set("enablePrivateNodes"))
            .flag("enable_private_endpoint", private.is_set("enablePrivateEndpoint"))
            .opt("master_ipv4_cidr_block", private.str_at("masterIpv4CidrBlock"));
        body.nested_opt("private_cluster_config", private_config);
    }

    if let Some(channel) = d.obj_at("releaseChannel").and_then(|c| c.str_at("channel")) {
        let mut release = Body::new();
        release.attr("channel", channel);
        body.nested("release_channel", release);
    }

    if let Some(pool) = d.obj_at("workloadIdentityConfig").and_then(|w| w.str_at("workloadPool")) {
        let mut workload = Body::new();
        workload.attr("workload_pool", pool);
        body.nested("workload_identity_config", workload);
    }

    declare("google_container_cluster", name, body)
}

/// Node pool; the owning cluster and location come from its self link.
pub fn node_pool(d: &Descriptor, ctx: &ConvertContext<'_>) -> ConvertResult {
    let name = d.require_str("name")?;
    let self_link = d.require_str("selfLink")?;
    let cluster = segment_after(self_link, "clusters").ok_or(MissingField("selfLink"))?;
    let location = segment_after(self_link, "locations")
        .or_else(|| segment_after(self_link, "zones"))
        .ok_or(MissingField("selfLink"))?;

    let mut body = Body::new();
    body.attr("name", name)
        .opt("project", ctx.project)
        .attr("location", location)
        .attr(
            "cluster",
            Value::reference("google_container_cluster", cluster, "name"),
        )
        .opt("initial_node_count", d.number_at("initialNodeCount"))
        .opt("version", d.str_at("version"));

    if let Some(scaling) = d.obj_at("autoscaling").filter(|a| a.is_set("enabled")) {
        let mut autoscaling = Body::new();
        autoscaling
            .opt("min_node_count", scaling.number_at("minNodeCount"))
            .opt("max_node_count", scaling.number_at("maxNodeCount"));
        body.nested_opt("autoscaling", autoscaling);
    }

    if let Some(config) = d.obj_at("config") {
        let mut node_config = Body::new();
        node_config
            .opt("machine_type", config.str_at("machineType"))
            .opt("disk_size_gb", config.number_at("diskSizeGb"))
            .opt("disk_type", config.str_at("diskType"))
            .opt("image_type", config.str_at("imageType"))
            .flag("preemptible", config.is_set("preemptible"))
            .flag("spot", config.is_set("spot"))
            .opt("service_account", config.str_at("serviceAccount"))
            .opt("oauth_scopes", config.strings_at("oauthScopes"))
            .opt("tags", config.strings_at("tags"))
            .opt("labels", config.map_at("labels"));
        body.nested_opt("node_config", node_config);
    }

    if let Some(management) = d.obj_at("management") {
        let mut manage = Body::new();
        manage
            .attr("auto_repair", management.is_set("autoRepair"))
            .attr("auto_upgrade", management.is_set("autoUpgrade"));
        body.nested("management", manage);
    }

    declare("google_container_node_pool", &format!("{}_{}", cluster, name), body)
}

pub fn sql_instance(d: &Descriptor, ctx: &ConvertContext<'_>) -> ConvertResult {
    let name = d.require_str("name")?;
    let version = d.require_str("databaseVersion")?;
    let settings = d.obj_at("settings").ok_or(MissingField("settings"))?;
    let tier = settings.require_str("tier")?;

    let mut body = Body::new();
    body.attr("name", name)
        .opt("project", ctx.project)
        .attr("database_version", version)
        .opt("region", d.str_at("region"));

    let mut settings_body = Body::new();
    settings_body
        .attr("tier", tier)
        .opt("availability_type", settings.str_at("availabilityType"))
        .opt("disk_size", settings.number_at("dataDiskSizeGb"))
        .opt("disk_type", settings.str_at("dataDiskType"))
        .opt("disk_autoresize", settings.bool_at("storageAutoResize"))
        .opt("deletion_protection_enabled", settings.bool_at("deletionProtectionEnabled"))
        .opt("user_labels", settings.map_at("userLabels"));

    if let Some(ip) = settings.obj_at("ipConfiguration") {
        let mut ip_config = Body::new();
        ip_config
            .attr("ipv4_enabled", ip.is_set("ipv4Enabled"))
            .opt("private_network", ip.str_at("privateNetwork"))
            .opt("ssl_mode", ip.str_at("sslMode"));
        for network in ip.list_at("authorizedNetworks").unwrap_or_default() {
            let mut authorized = Body::new();
            authorized
                .opt("name", network.str_at("name"))
                .attr("value", network.require_str("value")?);
            ip_config.nested("authorized_networks", authorized);
        }
        settings_body.nested("ip_configuration", ip_config);
    }

    if let Some(backup) = settings.obj_at("backupConfiguration") {
        let mut backup_config = Body::new();
        backup_config
            .attr("enabled", backup.is_set("enabled"))
            .opt("start_time", backup.str_at("startTime"))
            .flag("binary_log_enabled", backup.is_set("binaryLogEnabled"))
            .flag(
                "point_in_time_recovery_enabled",
                backup.is_set("pointInTimeRecoveryEnabled"),
            );
        settings_body.nested("backup_configuration", backup_config);
    }

    for flag in settings.list_at("databaseFlags").unwrap_or_default() {
        let mut database_flag = Body::new();
        database_flag
            .attr("name", flag.require_str("name")?)
            .attr("value", flag.require_str("value")?);
        settings_body.nested("database_flags", database_flag);
    }

    body.nested("settings", settings_body);

    declare("google_sql_database_instance", name, body)
}

pub fn pubsub_topic(d: &Descriptor, ctx: &ConvertContext<'_>) -> ConvertResult {
    let name = last_segment(d.require_str("name")?);

    let mut body = Body::new();
    body.attr("name", name)
        .opt("project", ctx.project)
        .opt("labels", d.map_at("labels"))
        .opt("kms_key_name", d.str_at("kmsKeyName"))
        .opt("message_retention_duration", d.str_at("messageRetentionDuration"));

    if let Some(regions) = d
        .obj_at("messageStoragePolicy")
        .and_then(|p| p.strings_at("allowedPersistenceRegions"))
    {
        let mut policy = Body::new();
        policy.attr("allowed_persistence_regions", regions);
        body.nested("message_storage_policy", policy);
    }

    declare("google_pubsub_topic", name, body)
}

/// Topic attribute of a subscription: a reference when the topic lives in
/// the same project, otherwise its full path.
fn topic_value(topic: &str, project: Option<&str>) -> Value {
    match segment_after(topic, "projects") {
        Some(owner) if Some(owner) == project => {
            Value::reference("google_pubsub_topic", last_segment(topic), "id")
        }
        _ => Value::from(topic),
    }
}

pub fn pubsub_subscription(d: &Descriptor, ctx: &ConvertContext<'_>) -> ConvertResult {
    let name = last_segment(d.require_str("name")?);
    let topic = d.require_str("topic")?;

    let mut body = Body::new();
    body.attr("name", name)
        .opt("project", ctx.project)
        .attr("topic", topic_value(topic, ctx.project))
        .opt("ack_deadline_seconds", d.number_at("ackDeadlineSeconds"))
        .opt("message_retention_duration", d.str_at("messageRetentionDuration"))
        .flag("retain_acked_messages", d.is_set("retainAckedMessages"))
        .flag("enable_message_ordering", d.is_set("enableMessageOrdering"))
        .opt("filter", d.str_at("filter"))
        .opt("labels", d.map_at("labels"));

    // An empty expiration policy means the subscription never expires.
    if let Some(expiration) = d.field("expirationPolicy").filter(|e| e.is_object()) {
        let mut policy = Body::new();
        policy.attr("ttl", expiration.str_at("ttl").unwrap_or(""));
        body.nested("expiration_policy", policy);
    }

    if let Some(retry) = d.obj_at("retryPolicy") {
        let mut policy = Body::new();
        policy
            .opt("minimum_backoff", retry.str_at("minimumBackoff"))
            .opt("maximum_backoff", retry.str_at("maximumBackoff"));
        body.nested_opt("retry_policy", policy);
    }

    if let Some(dead_letter) = d.obj_at("deadLetterPolicy") {
        let mut policy = Body::new();
        policy
            .opt("dead_letter_topic", dead_letter.str_at("deadLetterTopic"))
            .opt("max_delivery_attempts", dead_letter.number_at("maxDeliveryAttempts"));
        body.nested_opt("dead_letter_policy", policy);
    }

    if let Some(push) = d.obj_at("pushConfig").filter(|p| p.str_at("pushEndpoint").is_some()) {
        let mut push_config = Body::new();
        push_config
            .opt("push_endpoint", push.str_at("pushEndpoint"))
            .opt("attributes", push.map_at("attributes"));
        body.nested("push_config", push_config);
    }

    declare("google_pubsub_subscription", name, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{Conversion, Declaration};
    use serde_json::json;

    fn declared(result: ConvertResult) -> Declaration {
        match result {
            Ok(Conversion::Declare(d)) => d,
            other => panic!("expected declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_function_timeout_normalized() {
        let d = json!({
            "name": "projects/p/locations/us-central1/functions/resize",
            "buildConfig": {"runtime": "python311", "entryPoint": "main"},
            "serviceConfig": {"availableMemory": "256M"},
            "timeout": "60s"
        });
        let decl = declared(function(&d, &ConvertContext::project("p")));

        assert_eq!(decl.body.get("name"), Some(&Value::from("resize")));
        assert_eq!(decl.body.get("location"), Some(&Value::from("us-central1")));
        let service = decl.body.blocks("service_config").next().unwrap();
        assert_eq!(service.body.get("timeout_seconds"), Some(&Value::from(60i64)));
        assert_eq!(service.body.get("available_memory"), Some(&Value::from("256M")));
    }

    #[test]
    fn test_node_pool_from_self_link() {
        let d = json!({
            "name": "default-pool",
            "selfLink": "https://container.googleapis.com/v1/projects/p/locations/europe-west1/clusters/prod/nodePools/default-pool",
            "initialNodeCount": 3,
            "config": {"machineType": "e2-standard-4", "diskSizeGb": 100}
        });
        let decl = declared(node_pool(&d, &ConvertContext::project("p")));

        assert_eq!(decl.name_hint, "prod_default-pool");
        assert_eq!(decl.body.get("location"), Some(&Value::from("europe-west1")));
        assert_eq!(
            decl.body.get("cluster"),
            Some(&Value::Expression("google_container_cluster.prod.name".to_string()))
        );
    }

    #[test]
    fn test_sql_instance_requires_tier() {
        let d = json!({"name": "db", "databaseVersion": "POSTGRES_15", "settings": {}});
        assert_eq!(sql_instance(&d, &ConvertContext::default()), Err(MissingField("tier")));
    }

    #[test]
    fn test_sql_disk_size_from_string() {
        let d = json!({
            "name": "db",
            "databaseVersion": "POSTGRES_15",
            "region": "us-central1",
            "settings": {"tier": "db-f1-micro", "dataDiskSizeGb": "10"}
        });
        let decl = declared(sql_instance(&d, &ConvertContext::project("p")));
        let settings = decl.body.blocks("settings").next().unwrap();
        assert_eq!(settings.body.get("disk_size"), Some(&Value::from(10i64)));
    }

    #[test]
    fn test_subscription_topic_reference() {
        let ctx = ConvertContext::project("p");
        let local = json!({"name": "projects/p/subscriptions/s1", "topic": "projects/p/topics/orders"});
        let remote = json!({"name": "projects/p/subscriptions/s2", "topic": "projects/q/topics/events"});

        let decl = declared(pubsub_subscription(&local, &ctx));
        assert_eq!(
            decl.body.get("topic"),
            Some(&Value::Expression("google_pubsub_topic.orders.id".to_string()))
        );
        let decl = declared(pubsub_subscription(&remote, &ctx));
        assert_eq!(decl.body.get("topic"), Some(&Value::from("projects/q/topics/events")));
    }

    #[test]
    fn test_bucket_accepts_storage_cli_fields() {
        let d = json!({
            "name": "assets",
            "location": "EU",
            "default_storage_class": "STANDARD",
            "uniform_bucket_level_access": true,
            "versioning_enabled": true
        });
        let decl = declared(bucket(&d, &ConvertContext::project("p")));
        assert_eq!(decl.body.get("storage_class"), Some(&Value::from("STANDARD")));
        assert_eq!(decl.body.get("uniform_bucket_level_access"), Some(&Value::Bool(true)));
        assert_eq!(decl.body.blocks("versioning").count(), 1);
    }

    #[test]
    fn test_subscription_empty_groups_produce_no_blocks() {
        let d = json!({
            "name": "projects/p/subscriptions/s1",
            "topic": "projects/p/topics/orders",
            "deadLetterPolicy": {},
            "retryPolicy": {"unmapped": 1},
            "expirationPolicy": {}
        });
        let decl = declared(pubsub_subscription(&d, &ConvertContext::project("p")));

        assert_eq!(decl.body.blocks("dead_letter_policy").count(), 0);
        assert_eq!(decl.body.blocks("retry_policy").count(), 0);
        let expiration = decl.body.blocks("expiration_policy").next().unwrap();
        assert_eq!(expiration.body.get("ttl"), Some(&Value::from("")));
    }

    #[test]
    fn test_cluster_private_config_without_mapped_fields_omitted() {
        let d = json!({
            "name": "prod",
            "location": "us-central1",
            "privateClusterConfig": {"peeringName": "gke-peering"}
        });
        let decl = declared(gke_cluster(&d, &ConvertContext::project("p")));
        assert_eq!(decl.body.blocks("private_cluster_config").count(), 0);

        let rendered = crate::render::render_block(&crate::block::ConfigBlock::resource(
            decl.resource_type,
            "prod",
            decl.body,
        ));
        assert!(!rendered.contains("{}"));
    }
}
