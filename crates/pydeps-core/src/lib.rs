//! Dependency-layer synthesis engine for pydeps.
//!
//! Given a service manifest and the project's pinned requirements, this crate
//! finds every function on a Python runtime, attaches a per-runtime
//! dependency layer to it, and writes the resources that build that layer
//! into the host's template: a log group, an execution role, the packaging
//! function, the custom resource that invokes it, and the layer itself. The
//! `Augmenter` runs the whole pass; the pieces are exposed for hosts that
//! need finer control.

pub mod augment;
pub mod config;
pub mod context;
pub mod naming;
pub mod requirements;
pub mod scan;
pub mod synth;
pub mod writer;

pub use augment::{AugmentReport, Augmenter};
pub use config::{ConfigError, PydepsConfig};
pub use context::{DeploymentContext, DEPLOYMENT_BUCKET_ID};
pub use naming::{layer_id, ResourceNames, PYDEPS_MARKER};
pub use requirements::{
    ProjectRequirements, Requirements, RequirementsError, RequirementsLoader, StaticRequirements,
};
pub use scan::{attach_layers, scan_functions, QualifyingFunction, ScanResult};
pub use synth::{synthesize, DependencyResourceSet, PACKAGER_CODE};
pub use writer::write_resource_set;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("manifest error: {0}")]
    Manifest(#[from] pydeps_schema::ManifestError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Requirements(#[from] RequirementsError),
}
