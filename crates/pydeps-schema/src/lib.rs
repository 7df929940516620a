//! Service manifest, runtime classification, and template model for pydeps.
//!
//! This crate defines the schema layer: TOML service manifest parsing
//! (`ServiceManifest`), the runtime classifier (`classify_runtime`) that turns
//! raw runtime strings into identifier-safe `RuntimeTag`s, late-bound
//! references (`Intrinsic`), and the strongly-typed infrastructure template
//! (`Template`, `Resource`) the engine writes into.

pub mod intrinsic;
pub mod manifest;
pub mod runtime;
pub mod template;
pub mod types;

pub use intrinsic::Intrinsic;
pub use manifest::{
    parse_manifest_file, parse_manifest_str, validate_name, CustomSection, FunctionDefinition,
    LayerRef, ManifestError, ProviderSection, ServiceManifest, DEFAULT_RUNTIME, DEFAULT_STAGE,
};
pub use runtime::{classify_runtime, PYTHON_FAMILY};
pub use template::{
    DependencyPackageProperties, Effect, FunctionCode, FunctionProperties, InlinePolicy,
    LayerContent, LayerVersionProperties, LogGroupProperties, OtherProperties, PolicyDocument,
    Principal, Resource, ResourceProperties, RoleProperties, Statement, Template,
};
pub use types::{LogicalId, RuntimeTag};
