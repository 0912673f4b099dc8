//! # tfex_hcl
//!
//! Terraform configuration generation for tfex.
//!
//! This crate turns extracted resource descriptors into HCL:
//!
//! - Identifier sanitization with per-file collision handling
//! - One converter per resource kind, registered in a static table
//! - A typed block tree and a single renderer for quoting and alignment
//! - Fixed grouping of kinds into output files, written atomically
//! - Redaction of secrets in both HCL and the JSON model dump
//!
//! ## Example
//!
//! ```rust,no_run
//! use tfex_hcl::{ConvertContext, IntermediateModel, OutputAssembler};
//! use serde_json::json;
//! use std::path::Path;
//!
//! let mut model = IntermediateModel::new();
//! model.extend("buckets", vec![json!({"name": "logs", "location": "EU"})]);
//!
//! let assembler = OutputAssembler::default();
//! let assembly = assembler.assemble(&model, &ConvertContext::project("acme-prod"));
//! for unit in &assembly.units {
//!     assembler.write(unit, Path::new("./acme-prod")).unwrap();
//! }
//! ```

pub mod assemble;
pub mod block;
pub mod convert;
pub mod error;
pub mod model;
pub mod provider;
pub mod redact;
pub mod render;
pub mod sanitize;

pub use assemble::{
    unit_for_kind, Assembly, MalformedDescriptor, OutputAssembler, OutputUnit, Section, UnitSpec,
    DUMP_FILE, RESOURCE_UNITS,
};
pub use block::{Body, BodyItem, ConfigBlock, Value};
pub use convert::{
    convert, converter_for, converter_kinds, last_segment, segment_after, ConvertContext, Conversion,
    Declaration, DescriptorExt, MissingField,
};
pub use error::{HclError, HclResult};
pub use model::{Descriptor, IntermediateModel};
pub use provider::{ProviderSettings, DEFAULT_PROVIDER_VERSION, DEFAULT_REGION};
pub use redact::{is_sensitive, redact_json, REDACTED};
pub use render::{escape_string, render_block};
pub use sanitize::{sanitize, NameRegistry, MAX_IDENTIFIER_LEN};
