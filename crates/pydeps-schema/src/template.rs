//! Strongly-typed infrastructure template.
//!
//! Resources are kept in an insertion-ordered map keyed by [`LogicalId`] and
//! serialize to the CloudFormation document shape (`Type`, `DependsOn`,
//! `Properties`). The resource kinds this engine generates have typed
//! property structs; anything the host already put into the template is
//! carried as [`ResourceProperties::Other`].

use crate::intrinsic::Intrinsic;
use crate::types::LogicalId;
use indexmap::IndexMap;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";
pub const POLICY_VERSION: &str = "2012-10-17";

pub const LAYER_VERSION_TYPE: &str = "AWS::Lambda::LayerVersion";
pub const LOG_GROUP_TYPE: &str = "AWS::Logs::LogGroup";
pub const FUNCTION_TYPE: &str = "AWS::Lambda::Function";
pub const ROLE_TYPE: &str = "AWS::IAM::Role";
pub const DEPENDENCY_PACKAGE_TYPE: &str = "Custom::PythonDependencies";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    #[serde(rename = "Resources")]
    pub resources: IndexMap<LogicalId, Resource>,
}

impl Default for Template {
    fn default() -> Self {
        Self::new()
    }
}

impl Template {
    pub fn new() -> Self {
        Self {
            format_version: TEMPLATE_FORMAT_VERSION.to_owned(),
            resources: IndexMap::new(),
        }
    }

    /// Insert a resource, returning the one it replaced, if any.
    pub fn insert(&mut self, id: LogicalId, resource: Resource) -> Option<Resource> {
        self.resources.insert(id, resource)
    }

    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.resources.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LogicalId, &Resource)> {
        self.resources.iter()
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// One entry of the template's `Resources` section.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    /// Explicit ordering dependencies, on top of those implied by references.
    pub depends_on: Vec<LogicalId>,
    pub properties: ResourceProperties,
}

impl Resource {
    pub fn new(properties: ResourceProperties) -> Self {
        Self {
            depends_on: Vec::new(),
            properties,
        }
    }

    #[must_use]
    pub fn depends_on(mut self, ids: impl IntoIterator<Item = LogicalId>) -> Self {
        self.depends_on.extend(ids);
        self
    }

    pub fn resource_type(&self) -> &str {
        self.properties.resource_type()
    }

    /// Whether the orchestrator hands this resource to an external executor.
    pub fn is_custom(&self) -> bool {
        self.resource_type().starts_with("Custom::")
    }

    /// Logical ids referenced through `Ref`, `Fn::GetAtt` or `Fn::Sub` anywhere
    /// in the properties, deduplicated in first-seen order.
    pub fn implicit_references(&self) -> Vec<LogicalId> {
        let mut out = Vec::new();
        if let Ok(value) = serde_json::to_value(&self.properties) {
            collect_references(&value, &mut out);
        }
        out
    }
}

fn collect_references(value: &Value, out: &mut Vec<LogicalId>) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Ok(intrinsic) = serde_json::from_value::<Intrinsic>(value.clone()) {
                    for id in intrinsic.referenced_ids() {
                        if !out.contains(&id) {
                            out.push(id);
                        }
                    }
                    return;
                }
            }
            for v in map.values() {
                collect_references(v, out);
            }
        }
        Value::Array(items) => {
            for v in items {
                collect_references(v, out);
            }
        }
        _ => {}
    }
}

impl Serialize for Resource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.depends_on.is_empty() { 2 } else { 3 };
        let mut state = serializer.serialize_struct("Resource", len)?;
        state.serialize_field("Type", self.resource_type())?;
        if self.depends_on.is_empty() {
            state.skip_field("DependsOn")?;
        } else {
            state.serialize_field("DependsOn", &self.depends_on)?;
        }
        state.serialize_field("Properties", &self.properties)?;
        state.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResourceProperties {
    LayerVersion(LayerVersionProperties),
    LogGroup(LogGroupProperties),
    Function(FunctionProperties),
    Role(RoleProperties),
    DependencyPackage(DependencyPackageProperties),
    /// A resource of any other type, with untyped properties.
    Other(OtherProperties),
}

impl ResourceProperties {
    pub fn resource_type(&self) -> &str {
        match self {
            Self::LayerVersion(_) => LAYER_VERSION_TYPE,
            Self::LogGroup(_) => LOG_GROUP_TYPE,
            Self::Function(_) => FUNCTION_TYPE,
            Self::Role(_) => ROLE_TYPE,
            Self::DependencyPackage(_) => DEPENDENCY_PACKAGE_TYPE,
            Self::Other(other) => &other.resource_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OtherProperties {
    #[serde(skip)]
    pub resource_type: String,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl OtherProperties {
    pub fn new(resource_type: impl Into<String>, properties: Map<String, Value>) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LayerVersionProperties {
    pub content: LayerContent,
    pub layer_name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub compatible_runtimes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LayerContent {
    #[serde(rename = "S3Bucket")]
    pub s3_bucket: Intrinsic,
    #[serde(rename = "S3Key")]
    pub s3_key: Intrinsic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogGroupProperties {
    pub log_group_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FunctionProperties {
    pub code: FunctionCode,
    pub handler: String,
    pub memory_size: u32,
    pub role: Intrinsic,
    pub runtime: String,
    pub timeout: u32,
    pub function_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FunctionCode {
    pub zip_file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoleProperties {
    pub assume_role_policy_document: PolicyDocument,
    pub policies: Vec<InlinePolicy>,
    pub path: String,
    pub role_name: Intrinsic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InlinePolicy {
    pub policy_name: String,
    pub policy_document: PolicyDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Statement>,
}

impl PolicyDocument {
    pub fn new(statement: Vec<Statement>) -> Self {
        Self {
            version: POLICY_VERSION.to_owned(),
            statement,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub effect: Effect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    pub action: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resource: Vec<Intrinsic>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Principal {
    pub service: Vec<String>,
}

/// Properties of the custom resource that triggers the packaging executor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DependencyPackageProperties {
    pub service_token: Intrinsic,
    pub bucket: Intrinsic,
    pub prefix: String,
    pub requirements: String,
}
