//! Packaging executor contract for pydeps, plus the in-process pieces used to
//! exercise a synthesized template without a cloud account.
//!
//! - [`contract`]: request/response shapes of the packaging custom resource
//!   and the deterministic artifact naming used by in-process executors. The
//!   deployed packager derives keys the same way but with its own hash, so
//!   its keys are not comparable with [`artifact_for`].
//! - [`PackagingExecutor`]: the worker behind a packager function.
//! - [`MockExecutor`]: an in-memory executor for tests.
//! - [`HostOrchestrator`]: deploys a template in dependency order and drives
//!   custom resources through registered executors.

pub mod contract;
pub mod executor;
pub mod host;
pub mod mock;

pub use contract::{
    artifact_for, Artifact, PackagingProperties, PackagingRequest, PackagingResponse,
    RequestType, ResponseData, ResponseStatus, MAX_REASON_LEN,
};
pub use executor::PackagingExecutor;
pub use host::{HostOrchestrator, ProvisionedResource, ProvisionedStack};
pub use mock::MockExecutor;

use pydeps_schema::LogicalId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("resource {from} references unknown resource {to}")]
    UnknownReference { from: LogicalId, to: LogicalId },
    #[error("dependency cycle involving {0}")]
    Cycle(LogicalId),
    #[error("no packaging executor registered for {0}")]
    NoExecutor(LogicalId),
    #[error("cannot resolve {reference} for {id}")]
    Unresolved { id: LogicalId, reference: String },
    #[error("invalid property on {id}: {reason}")]
    InvalidProperty { id: LogicalId, reason: String },
    #[error("{id} failed: {reason}")]
    ResourceFailed { id: LogicalId, reason: String },
}
