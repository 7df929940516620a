use crate::contract::{PackagingRequest, PackagingResponse};

/// Out-of-process worker behind a packaging custom resource.
///
/// An executor resolves the requirements for the interpreter it runs on,
/// uploads one bundle under the request's prefix and answers with the key.
/// It always answers: failures are reported in the response, never raised.
pub trait PackagingExecutor: Send + Sync {
    fn name(&self) -> &str;

    /// Full interpreter version the executor resolves against, e.g. `3.9.18`.
    fn interpreter_version(&self) -> &str;

    fn handle(&self, request: &PackagingRequest) -> PackagingResponse;
}
