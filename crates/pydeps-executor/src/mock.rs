use crate::contract::{artifact_for, PackagingRequest, PackagingResponse, RequestType};
use crate::executor::PackagingExecutor;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Default)]
struct MockState {
    /// `bucket/key` -> number of requirement specifiers bundled.
    objects: BTreeMap<String, usize>,
    requests: Vec<PackagingRequest>,
}

/// In-memory executor: "uploads" go to a map, deletes remove from it.
pub struct MockExecutor {
    interpreter_version: String,
    failure: Option<String>,
    state: Mutex<MockState>,
}

impl MockExecutor {
    pub fn new(interpreter_version: &str) -> Self {
        Self {
            interpreter_version: interpreter_version.to_owned(),
            failure: None,
            state: Mutex::new(MockState::default()),
        }
    }

    /// Make every Create/Update fail with the given diagnostic.
    #[must_use]
    pub fn failing_with(mut self, diagnostic: &str) -> Self {
        self.failure = Some(diagnostic.to_owned());
        self
    }

    /// Stored objects as `bucket/key`.
    pub fn objects(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|s| s.objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn requests(&self) -> Vec<PackagingRequest> {
        self.state
            .lock()
            .map(|s| s.requests.clone())
            .unwrap_or_default()
    }
}

impl PackagingExecutor for MockExecutor {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn interpreter_version(&self) -> &str {
        &self.interpreter_version
    }

    fn handle(&self, request: &PackagingRequest) -> PackagingResponse {
        let props = &request.resource_properties;
        let artifact = artifact_for(props, &self.interpreter_version);
        let pid = artifact.physical_resource_id.clone();

        let Ok(mut state) = self.state.lock() else {
            return PackagingResponse::failed(pid, "mock executor state poisoned");
        };
        state.requests.push(request.clone());
        let object = format!("{}/{}", props.bucket, artifact.key);

        match request.request_type {
            RequestType::Delete => {
                // Only the artifact this resource created is removed; a stale
                // physical id means a newer artifact already replaced it.
                if request.physical_resource_id.as_deref() == Some(pid.as_str()) {
                    state.objects.remove(&object);
                }
                PackagingResponse::success(pid, artifact.key)
            }
            RequestType::Create | RequestType::Update => {
                if let Some(diagnostic) = &self.failure {
                    return PackagingResponse::failed(
                        pid,
                        &format!("pip failed [1]:\n\n{diagnostic}"),
                    );
                }
                let specifiers = props
                    .requirements
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty() && !l.starts_with('#'))
                    .count();
                state.objects.insert(object, specifiers);
                PackagingResponse::success(pid, artifact.key)
            }
        }
    }
}
