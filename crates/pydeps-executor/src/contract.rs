//! Request/response shapes of the packaging custom resource.
//!
//! Field names follow the orchestrator's custom-resource callback framing
//! (PascalCase JSON). Property values arrive already resolved: the bucket is
//! a bucket name, not a reference.

use pydeps_schema::LogicalId;
use serde::{Deserialize, Serialize};

/// Diagnostic output kept in a failure reason; the callback body is size limited.
pub const MAX_REASON_LEN: usize = 700;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackagingProperties {
    pub bucket: String,
    pub prefix: String,
    pub requirements: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackagingRequest {
    pub request_type: RequestType,
    pub logical_resource_id: LogicalId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
    pub resource_properties: PackagingProperties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_resource_properties: Option<PackagingProperties>,
}

impl PackagingRequest {
    pub fn create(logical_resource_id: LogicalId, properties: PackagingProperties) -> Self {
        Self {
            request_type: RequestType::Create,
            logical_resource_id,
            physical_resource_id: None,
            resource_properties: properties,
            old_resource_properties: None,
        }
    }

    pub fn update(
        logical_resource_id: LogicalId,
        physical_resource_id: String,
        properties: PackagingProperties,
        old: PackagingProperties,
    ) -> Self {
        Self {
            request_type: RequestType::Update,
            logical_resource_id,
            physical_resource_id: Some(physical_resource_id),
            resource_properties: properties,
            old_resource_properties: Some(old),
        }
    }

    pub fn delete(
        logical_resource_id: LogicalId,
        physical_resource_id: String,
        properties: PackagingProperties,
    ) -> Self {
        Self {
            request_type: RequestType::Delete,
            logical_resource_id,
            physical_resource_id: Some(physical_resource_id),
            resource_properties: properties,
            old_resource_properties: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseStatus {
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "FAILED")]
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResponseData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackagingResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub physical_resource_id: String,
    #[serde(default)]
    pub data: ResponseData,
}

impl PackagingResponse {
    pub fn success(physical_resource_id: String, key: String) -> Self {
        Self {
            status: ResponseStatus::Success,
            reason: None,
            physical_resource_id,
            data: ResponseData { key: Some(key) },
        }
    }

    /// A failure carrying the tail of the diagnostic output.
    pub fn failed(physical_resource_id: String, diagnostic: &str) -> Self {
        Self {
            status: ResponseStatus::Failed,
            reason: Some(tail(diagnostic, MAX_REASON_LEN).to_owned()),
            physical_resource_id,
            data: ResponseData::default(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

/// Where a requirement set is stored: the physical id and object key are
/// both derived from the requirement text and interpreter version, so an
/// unchanged requirement set maps to the same artifact. The digest is
/// blake3 here; the embedded packager uses blake2b, so the scheme matches
/// but keys differ between the two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub physical_resource_id: String,
    pub key: String,
}

pub fn artifact_for(properties: &PackagingProperties, interpreter_version: &str) -> Artifact {
    let hashed = format!(
        "{} XX_VERSION_XX {interpreter_version}",
        properties.requirements
    );
    let hex = blake3::hash(hashed.as_bytes()).to_hex();
    let digest = &hex.as_str()[..32];
    Artifact {
        physical_resource_id: format!("req-{digest}"),
        key: format!("{}/{digest}.zip", properties.prefix),
    }
}

fn tail(s: &str, max_chars: usize) -> &str {
    let count = s.chars().count();
    if count <= max_chars {
        return s;
    }
    let skip = count - max_chars;
    let start = s.char_indices().nth(skip).map_or(s.len(), |(i, _)| i);
    &s[start..]
}
