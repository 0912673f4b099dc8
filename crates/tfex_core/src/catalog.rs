//! Static routine table and capability gating.
//!
//! Every resource kind is one [`Routine`] row: the capabilities that
//! unlock it, where its descriptors come from, and which account kind it
//! applies to. Adding a kind means adding a row.

use std::collections::HashSet;
use std::fmt;

use serde_json::json;
use tfex_hcl::{last_segment, Descriptor, DescriptorExt, MissingField};

use crate::capability::{Capabilities, ORGANIZATION};
use crate::context::AccountKind;
use crate::error::{CoreError, CoreResult};

/// Capabilities a routine needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Uses a surface that is always enabled
    Always,
    /// Runs when any of these capabilities is present
    AnyOf(&'static [&'static str]),
}

impl Requirement {
    pub fn is_satisfied_by(&self, capabilities: &Capabilities) -> bool {
        match self {
            Requirement::Always => true,
            Requirement::AnyOf(required) => required.iter().any(|c| capabilities.contains(c)),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Requirement::Always => "always".to_string(),
            Requirement::AnyOf(required) => required.join(" | "),
        }
    }
}

/// How a listing is split across locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeMode {
    Global,
    /// One call per configured region, passing the region with this flag
    Regional(&'static str),
    /// One call per configured zone, passing the zone with this flag
    Zonal(&'static str),
}

/// Extra arguments for one parent descriptor.
pub type BindFn = fn(&Descriptor) -> Result<Vec<String>, MissingField>;

/// Child descriptors computed from one parent descriptor.
pub type DeriveFn = fn(&Descriptor) -> Vec<Descriptor>;

/// Where a routine's descriptors come from.
///
/// `args` may contain `{account}`, replaced with the account id.
#[derive(Clone, Copy)]
pub enum Source {
    /// A listing command, optionally split by region or zone.
    List {
        args: &'static [&'static str],
        scope: ScopeMode,
    },
    /// One listing per descriptor of the parent kind.
    PerParent {
        parent: &'static str,
        args: &'static [&'static str],
        bind: BindFn,
    },
    /// Computed from the parent kind's descriptors without a query.
    Derived {
        parent: &'static str,
        derive: DeriveFn,
    },
    /// One query whose `field` array holds the descriptors.
    Expand {
        args: &'static [&'static str],
        field: &'static str,
    },
}

impl Source {
    /// Kind this routine depends on, if any.
    pub fn parent(&self) -> Option<&'static str> {
        match self {
            Source::PerParent { parent, .. } | Source::Derived { parent, .. } => Some(parent),
            Source::List { .. } | Source::Expand { .. } => None,
        }
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::List { args, scope } => f
                .debug_struct("List")
                .field("args", args)
                .field("scope", scope)
                .finish(),
            Source::PerParent { parent, args, .. } => f
                .debug_struct("PerParent")
                .field("parent", parent)
                .field("args", args)
                .finish_non_exhaustive(),
            Source::Derived { parent, .. } => f
                .debug_struct("Derived")
                .field("parent", parent)
                .finish_non_exhaustive(),
            Source::Expand { args, field } => f
                .debug_struct("Expand")
                .field("args", args)
                .field("field", field)
                .finish(),
        }
    }
}

/// One extraction routine. Its id is also its resource-kind key.
#[derive(Debug, Clone, Copy)]
pub struct Routine {
    pub id: &'static str,
    pub description: &'static str,
    pub account: AccountKind,
    pub requires: Requirement,
    pub source: Source,
}

impl Routine {
    pub fn should_run(&self, capabilities: &Capabilities) -> bool {
        self.requires.is_satisfied_by(capabilities)
    }
}

const COMPUTE: Requirement = Requirement::AnyOf(&["compute"]);
const STORAGE: Requirement = Requirement::AnyOf(&["storage", "storage-api", "storage-component"]);
const FUNCTIONS: Requirement = Requirement::AnyOf(&["cloudfunctions"]);
const CONTAINER: Requirement = Requirement::AnyOf(&["container"]);
const SQL: Requirement = Requirement::AnyOf(&["sqladmin", "sql-component"]);
const PUBSUB: Requirement = Requirement::AnyOf(&["pubsub"]);
const ORG: Requirement = Requirement::AnyOf(&[ORGANIZATION]);

const fn project(id: &'static str, description: &'static str, requires: Requirement, source: Source) -> Routine {
    Routine {
        id,
        description,
        account: AccountKind::Project,
        requires,
        source,
    }
}

const fn org(id: &'static str, description: &'static str, source: Source) -> Routine {
    Routine {
        id,
        description,
        account: AccountKind::Organization,
        requires: ORG,
        source,
    }
}

const fn list(args: &'static [&'static str]) -> Source {
    Source::List {
        args,
        scope: ScopeMode::Global,
    }
}

/// Standard routines in execution order; parents precede children.
pub const STANDARD_ROUTINES: &[Routine] = &[
    project("networks", "VPC networks", COMPUTE, list(&["compute", "networks", "list"])),
    project(
        "subnets",
        "VPC subnetworks",
        COMPUTE,
        Source::List {
            args: &["compute", "networks", "subnets", "list"],
            scope: ScopeMode::Regional("--regions"),
        },
    ),
    project("firewalls", "Firewall rules", COMPUTE, list(&["compute", "firewall-rules", "list"])),
    project("routes", "Routes", COMPUTE, list(&["compute", "routes", "list"])),
    project(
        "routers",
        "Cloud Routers",
        COMPUTE,
        Source::List {
            args: &["compute", "routers", "list"],
            scope: ScopeMode::Regional("--regions"),
        },
    ),
    project(
        "vpn_gateways",
        "HA VPN gateways",
        COMPUTE,
        Source::List {
            args: &["compute", "vpn-gateways", "list"],
            scope: ScopeMode::Regional("--regions"),
        },
    ),
    project(
        "vpn_tunnels",
        "VPN tunnels",
        COMPUTE,
        Source::List {
            args: &["compute", "vpn-tunnels", "list"],
            scope: ScopeMode::Regional("--regions"),
        },
    ),
    project(
        "peerings",
        "VPC network peerings",
        COMPUTE,
        Source::Derived {
            parent: "networks",
            derive: network_peerings,
        },
    ),
    project(
        "instances",
        "Compute Engine instances",
        COMPUTE,
        Source::List {
            args: &["compute", "instances", "list"],
            scope: ScopeMode::Zonal("--zones"),
        },
    ),
    project("buckets", "Cloud Storage buckets", STORAGE, list(&["storage", "buckets", "list"])),
    project(
        "functions",
        "Cloud Functions",
        FUNCTIONS,
        Source::List {
            args: &["functions", "list"],
            scope: ScopeMode::Regional("--regions"),
        },
    ),
    project("gke_clusters", "GKE clusters", CONTAINER, list(&["container", "clusters", "list"])),
    project(
        "node_pools",
        "GKE node pools",
        CONTAINER,
        Source::PerParent {
            parent: "gke_clusters",
            args: &["container", "node-pools", "list"],
            bind: cluster_args,
        },
    ),
    project("sql_instances", "Cloud SQL instances", SQL, list(&["sql", "instances", "list"])),
    project("pubsub_topics", "Pub/Sub topics", PUBSUB, list(&["pubsub", "topics", "list"])),
    project(
        "pubsub_subscriptions",
        "Pub/Sub subscriptions",
        PUBSUB,
        list(&["pubsub", "subscriptions", "list"]),
    ),
    project(
        "service_accounts",
        "IAM service accounts",
        Requirement::Always,
        list(&["iam", "service-accounts", "list"]),
    ),
    org(
        "folders",
        "Top-level folders",
        list(&["resource-manager", "folders", "list", "--organization={account}"]),
    ),
    org(
        "subfolders",
        "Folders nested one level below top-level folders",
        Source::PerParent {
            parent: "folders",
            args: &["resource-manager", "folders", "list"],
            bind: folder_args,
        },
    ),
    org("projects", "Projects under the organization", list(&["projects", "list", "--filter=parent.id={account}"])),
    org(
        "org_policies",
        "Organization policy listing",
        list(&["resource-manager", "org-policies", "list", "--organization={account}"]),
    ),
    org(
        "org_policy_details",
        "Organization policies",
        Source::PerParent {
            parent: "org_policies",
            args: &["resource-manager", "org-policies", "describe", "--organization={account}"],
            bind: constraint_args,
        },
    ),
    org(
        "org_iam_bindings",
        "Organization IAM bindings",
        Source::Expand {
            args: &["organizations", "get-iam-policy", "{account}"],
            field: "bindings",
        },
    ),
    org(
        "tag_keys",
        "Tag keys",
        list(&["resource-manager", "tags", "keys", "list", "--parent=organizations/{account}"]),
    ),
    org(
        "tag_values",
        "Tag values",
        Source::PerParent {
            parent: "tag_keys",
            args: &["resource-manager", "tags", "values", "list"],
            bind: tag_key_args,
        },
    ),
    org("billing_accounts", "Billing accounts", list(&["billing", "accounts", "list"])),
];

fn network_peerings(network: &Descriptor) -> Vec<Descriptor> {
    let Some(name) = network.str_at("name") else {
        return Vec::new();
    };
    network
        .list_at("peerings")
        .unwrap_or_default()
        .iter()
        .map(|peering| json!({"network": name, "peering": peering}))
        .collect()
}

fn cluster_args(cluster: &Descriptor) -> Result<Vec<String>, MissingField> {
    Ok(vec![
        format!("--cluster={}", cluster.require_str("name")?),
        format!("--location={}", cluster.require_str("location")?),
    ])
}

fn folder_args(folder: &Descriptor) -> Result<Vec<String>, MissingField> {
    Ok(vec![format!("--folder={}", last_segment(folder.require_str("name")?))])
}

fn constraint_args(policy: &Descriptor) -> Result<Vec<String>, MissingField> {
    Ok(vec![policy.require_str("constraint")?.to_string()])
}

fn tag_key_args(key: &Descriptor) -> Result<Vec<String>, MissingField> {
    Ok(vec![format!("--parent={}", key.require_str("name")?)])
}

/// Read-only routine table.
#[derive(Debug, Clone)]
pub struct ExtractionCatalog {
    routines: Vec<Routine>,
}

impl Default for ExtractionCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl ExtractionCatalog {
    /// The built-in catalog.
    pub fn standard() -> Self {
        Self {
            routines: STANDARD_ROUTINES.to_vec(),
        }
    }

    /// Custom catalog, validated.
    pub fn new(routines: Vec<Routine>) -> CoreResult<Self> {
        let catalog = Self { routines };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Check that ids are unique and every parent precedes its children.
    pub fn validate(&self) -> CoreResult<()> {
        let mut seen = HashSet::new();
        for routine in &self.routines {
            if let Some(parent) = routine.source.parent() {
                if !seen.contains(parent) {
                    return Err(CoreError::Catalog(format!(
                        "routine '{}' runs before its parent '{}'",
                        routine.id, parent
                    )));
                }
            }
            if !seen.insert(routine.id) {
                return Err(CoreError::Catalog(format!("duplicate routine '{}'", routine.id)));
            }
        }
        Ok(())
    }

    pub fn routines(&self) -> &[Routine] {
        &self.routines
    }

    pub fn get(&self, id: &str) -> Option<&Routine> {
        self.routines.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.routines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routines.is_empty()
    }

    /// Routines applicable to one kind of account, in execution order.
    pub fn for_account(&self, kind: AccountKind) -> impl Iterator<Item = &Routine> {
        self.routines.iter().filter(move |r| r.account == kind)
    }

    /// Ids of routines whose requirement `capabilities` satisfies, in
    /// execution order.
    pub fn routines_for(&self, capabilities: &Capabilities) -> Vec<&'static str> {
        self.routines
            .iter()
            .filter(|r| r.should_run(capabilities))
            .map(|r| r.id)
            .collect()
    }

    /// Whether `id` may run under `capabilities`. Unknown ids never run.
    pub fn should_run(&self, id: &str, capabilities: &Capabilities) -> bool {
        self.get(id).map(|r| r.should_run(capabilities)).unwrap_or(false)
    }
}

/// Replace `{account}` in catalog arguments.
pub fn expand_args(args: &[&str], account_id: &str) -> Vec<String> {
    args.iter().map(|a| a.replace("{account}", account_id)).collect()
}
