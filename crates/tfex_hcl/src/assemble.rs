//! Grouping of declarations into output files and writing them.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::block::ConfigBlock;
use crate::convert::{convert, ConvertContext, Conversion};
use crate::error::{HclError, HclResult};
use crate::model::IntermediateModel;
use crate::provider::{organization_blocks, ProviderSettings};
use crate::render::render_block;
use crate::sanitize::NameRegistry;

/// File name of the structured model dump.
pub const DUMP_FILE: &str = "resources.json";

/// One output file and the kinds it carries, in section order.
#[derive(Debug, Clone, Copy)]
pub struct UnitSpec {
    pub file_name: &'static str,
    pub sections: &'static [(&'static str, &'static str)],
}

/// Resource families, in write order. Each `(kind, title)` pair becomes a
/// titled section of the file.
pub const RESOURCE_UNITS: &[UnitSpec] = &[
    UnitSpec { file_name: "networks.tf", sections: &[("networks", "VPC Networks"), ("subnets", "Subnets")] },
    UnitSpec { file_name: "firewall.tf", sections: &[("firewalls", "Firewall Rules")] },
    UnitSpec { file_name: "routes.tf", sections: &[("routes", "Routes")] },
    UnitSpec { file_name: "routers.tf", sections: &[("routers", "Cloud Routers")] },
    UnitSpec {
        file_name: "vpn.tf",
        sections: &[("vpn_gateways", "HA VPN Gateways"), ("vpn_tunnels", "VPN Tunnels")],
    },
    UnitSpec { file_name: "peering.tf", sections: &[("peerings", "Network Peerings")] },
    UnitSpec { file_name: "compute.tf", sections: &[("instances", "Compute Instances")] },
    UnitSpec { file_name: "storage.tf", sections: &[("buckets", "Cloud Storage Buckets")] },
    UnitSpec { file_name: "functions.tf", sections: &[("functions", "Cloud Functions")] },
    UnitSpec {
        file_name: "gke.tf",
        sections: &[("gke_clusters", "GKE Clusters"), ("node_pools", "GKE Node Pools")],
    },
    UnitSpec { file_name: "sql.tf", sections: &[("sql_instances", "Cloud SQL Instances")] },
    UnitSpec {
        file_name: "pubsub.tf",
        sections: &[("pubsub_topics", "Pub/Sub Topics"), ("pubsub_subscriptions", "Pub/Sub Subscriptions")],
    },
    UnitSpec { file_name: "iam.tf", sections: &[("service_accounts", "Service Accounts")] },
    UnitSpec { file_name: "folders.tf", sections: &[("folders", "Folders"), ("subfolders", "Subfolders")] },
    UnitSpec { file_name: "org_policies.tf", sections: &[("org_policy_details", "Organization Policies")] },
    UnitSpec { file_name: "org_iam.tf", sections: &[("org_iam_bindings", "Organization IAM Bindings")] },
    UnitSpec { file_name: "tags.tf", sections: &[("tag_keys", "Tag Keys"), ("tag_values", "Tag Values")] },
];

/// Unit that carries `kind`, if any.
pub fn unit_for_kind(kind: &str) -> Option<&'static UnitSpec> {
    RESOURCE_UNITS
        .iter()
        .find(|unit| unit.sections.iter().any(|(k, _)| *k == kind))
}

/// A titled run of blocks inside a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: String,
    pub blocks: Vec<ConfigBlock>,
}

/// One generated file.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputUnit {
    pub file_name: String,
    pub sections: Vec<Section>,
}

impl OutputUnit {
    pub fn block_count(&self) -> usize {
        self.sections.iter().map(|s| s.blocks.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.block_count() == 0
    }

    /// Final file text: sections separated by a blank line, a single
    /// trailing newline.
    pub fn render(&self) -> String {
        self.sections
            .iter()
            .filter(|s| !s.blocks.is_empty())
            .map(|section| {
                let blocks: Vec<String> = section.blocks.iter().map(render_block).collect();
                format!("# {}\n\n{}", section.title, blocks.join("\n"))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A descriptor skipped because a required field was missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedDescriptor {
    pub kind: String,
    pub index: usize,
    pub field: &'static str,
}

impl fmt::Display for MalformedDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}] is missing required field '{}'", self.kind, self.index, self.field)
    }
}

/// Result of assembling one account.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assembly {
    pub units: Vec<OutputUnit>,
    pub warnings: Vec<MalformedDescriptor>,
    /// Descriptors intentionally left out (platform-managed)
    pub skipped: usize,
}

impl Assembly {
    pub fn unit(&self, file_name: &str) -> Option<&OutputUnit> {
        self.units.iter().find(|u| u.file_name == file_name)
    }
}

/// Builds and writes the output units for one account.
#[derive(Debug, Clone, Default)]
pub struct OutputAssembler {
    settings: ProviderSettings,
}

impl OutputAssembler {
    pub fn new(settings: ProviderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    /// Convert every populated kind and group the blocks into units.
    ///
    /// Identifiers are unique within a unit; a malformed descriptor is
    /// skipped and reported without affecting its siblings.
    pub fn assemble(&self, model: &IntermediateModel, ctx: &ConvertContext<'_>) -> Assembly {
        let mut assembly = Assembly::default();

        assembly.units.push(single_section_unit(
            "provider.tf",
            "Provider",
            self.settings.provider_blocks(ctx),
        ));
        assembly.units.push(single_section_unit(
            "variables.tf",
            "Variables",
            self.settings.variable_blocks(ctx),
        ));
        let org = organization_blocks(ctx);
        if !org.is_empty() {
            assembly.units.push(single_section_unit("organization.tf", "Organization", org));
        }

        for spec in RESOURCE_UNITS {
            let mut registry = NameRegistry::new();
            let mut unit = OutputUnit {
                file_name: spec.file_name.to_string(),
                sections: Vec::new(),
            };

            for (kind, title) in spec.sections {
                let mut blocks = Vec::new();
                for (index, descriptor) in model.get(kind).iter().enumerate() {
                    match convert(kind, descriptor, ctx) {
                        Some(Ok(Conversion::Declare(decl))) => {
                            let identifier = registry.claim(&decl.name_hint);
                            blocks.push(ConfigBlock::resource(decl.resource_type, &identifier, decl.body));
                        }
                        Some(Ok(Conversion::Skip(reason))) => {
                            debug!("Skipping {}[{}]: {}", kind, index, reason);
                            assembly.skipped += 1;
                        }
                        Some(Err(missing)) => {
                            let malformed = MalformedDescriptor {
                                kind: kind.to_string(),
                                index,
                                field: missing.0,
                            };
                            warn!("Skipping descriptor: {}", malformed);
                            assembly.warnings.push(malformed);
                        }
                        None => {}
                    }
                }
                if !blocks.is_empty() {
                    unit.sections.push(Section {
                        title: title.to_string(),
                        blocks,
                    });
                }
            }

            if unit.is_empty() {
                debug!("No resources for {}, not writing it", spec.file_name);
            } else {
                assembly.units.push(unit);
            }
        }

        assembly
    }

    /// Create `destination` if needed and confirm it accepts files.
    pub fn prepare_destination(&self, destination: &Path) -> HclResult<()> {
        std::fs::create_dir_all(destination).map_err(|source| HclError::Destination {
            path: destination.to_path_buf(),
            source,
        })?;
        NamedTempFile::new_in(destination)
            .map(drop)
            .map_err(|source| HclError::Destination {
                path: destination.to_path_buf(),
                source,
            })
    }

    /// Write one unit into `destination`, replacing any previous file.
    pub fn write(&self, unit: &OutputUnit, destination: &Path) -> HclResult<PathBuf> {
        let path = destination.join(&unit.file_name);
        persist(destination, &path, unit.render().as_bytes())?;
        info!("Wrote {} ({} blocks)", path.display(), unit.block_count());
        Ok(path)
    }

    /// Write the redacted model dump.
    pub fn write_dump(&self, model: &IntermediateModel, destination: &Path) -> HclResult<PathBuf> {
        let path = destination.join(DUMP_FILE);
        let mut text = serde_json::to_string_pretty(&model.to_dump())?;
        text.push('\n');
        persist(destination, &path, text.as_bytes())?;
        info!("Wrote {} ({} resources)", path.display(), model.total());
        Ok(path)
    }
}

fn single_section_unit(file_name: &str, title: &str, blocks: Vec<ConfigBlock>) -> OutputUnit {
    OutputUnit {
        file_name: file_name.to_string(),
        sections: vec![Section {
            title: title.to_string(),
            blocks,
        }],
    }
}

/// Write through a temporary file in the same directory, then rename.
/// The temporary file is removed when dropped on any error path.
fn persist(dir: &Path, path: &Path, contents: &[u8]) -> HclResult<()> {
    let write_err = |source: std::io::Error| HclError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = NamedTempFile::new_in(dir).map_err(write_err)?;
    file.write_all(contents).map_err(write_err)?;
    file.as_file().sync_all().map_err(write_err)?;
    file.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
