use crate::intrinsic::Intrinsic;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Stage used when the manifest does not name one.
pub const DEFAULT_STAGE: &str = "dev";

/// Runtime the host assigns to functions when neither the function nor the
/// provider declares one.
pub const DEFAULT_RUNTIME: &str = "nodejs14.x";

const SUPPORTED_PROVIDER: &str = "aws";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("service must not be empty")]
    EmptyService,
    #[error("stage must not be empty")]
    EmptyStage,
    #[error("invalid {field} '{value}': only ASCII letters, digits and '-' are allowed")]
    InvalidName { field: &'static str, value: String },
    #[error("unsupported provider '{0}', only 'aws' provides layers")]
    UnsupportedProvider(String),
}

/// Declarative service description: the functions to deploy and their provider defaults.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServiceManifest {
    pub service: String,
    #[serde(default)]
    pub provider: ProviderSection,
    #[serde(default)]
    pub functions: IndexMap<String, FunctionDefinition>,
    #[serde(default)]
    pub custom: CustomSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ProviderSection {
    #[serde(default = "default_provider")]
    pub name: String,
    #[serde(default)]
    pub runtime: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    /// Deployment-wide default layers, used by functions without their own list.
    #[serde(default)]
    pub layers: Option<Vec<LayerRef>>,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            name: default_provider(),
            runtime: None,
            stage: None,
            layers: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct FunctionDefinition {
    #[serde(default)]
    pub handler: Option<String>,
    #[serde(default)]
    pub runtime: Option<String>,
    #[serde(default)]
    pub layers: Option<Vec<LayerRef>>,
    /// Fields the engine does not interpret (events, environment, ...), kept as-is.
    #[serde(flatten)]
    pub extra: toml::Table,
}

/// Plugin configuration sections, keyed by plugin.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct CustomSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pydeps: Option<toml::Table>,
    #[serde(flatten)]
    pub other: toml::Table,
}

/// A layer attached to a function: either a literal ARN or a template reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayerRef {
    Arn(String),
    Intrinsic(Intrinsic),
}

impl From<Intrinsic> for LayerRef {
    fn from(value: Intrinsic) -> Self {
        Self::Intrinsic(value)
    }
}

impl From<&str> for LayerRef {
    fn from(value: &str) -> Self {
        Self::Arn(value.to_owned())
    }
}

impl ServiceManifest {
    /// Deployment stage, falling back to [`DEFAULT_STAGE`].
    pub fn stage(&self) -> &str {
        self.provider.stage.as_deref().unwrap_or(DEFAULT_STAGE)
    }

    /// Raw runtime of a function, inheriting from the provider and then the host default.
    pub fn runtime_of<'a>(&'a self, function: &'a FunctionDefinition) -> &'a str {
        function
            .runtime
            .as_deref()
            .or(self.provider.runtime.as_deref())
            .unwrap_or(DEFAULT_RUNTIME)
    }

    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.provider.name != SUPPORTED_PROVIDER {
            return Err(ManifestError::UnsupportedProvider(
                self.provider.name.clone(),
            ));
        }
        if self.service.trim().is_empty() {
            return Err(ManifestError::EmptyService);
        }
        validate_name("service", &self.service)?;
        let stage = self.stage();
        if stage.trim().is_empty() {
            return Err(ManifestError::EmptyStage);
        }
        validate_name("stage", stage)
    }
}

/// Check that a value can be embedded in generated resource names.
pub fn validate_name(field: &'static str, value: &str) -> Result<(), ManifestError> {
    if value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        Ok(())
    } else {
        Err(ManifestError::InvalidName {
            field,
            value: value.to_owned(),
        })
    }
}

fn default_provider() -> String {
    SUPPORTED_PROVIDER.to_owned()
}

pub fn parse_manifest_str(input: &str) -> Result<ServiceManifest, ManifestError> {
    let manifest: ServiceManifest = toml::from_str(input)?;
    manifest.validate()?;
    Ok(manifest)
}

pub fn parse_manifest_file(path: impl AsRef<Path>) -> Result<ServiceManifest, ManifestError> {
    let content = fs::read_to_string(path)?;
    parse_manifest_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_manifest() {
        let input = r#"
service = "orders"

[provider]
name = "aws"
runtime = "python3.9"
stage = "prod"
layers = ["arn:aws:lambda:eu-west-1:123456789012:layer:shared:3"]

[functions.api]
handler = "api.handler"
events = [{ http = "GET /orders" }]

[functions.worker]
handler = "worker.handler"
runtime = "python3.8"
layers = [{ Ref = "SharedLayer" }]

[custom.pydeps]
memory_size = 2048
"#;
        let manifest = parse_manifest_str(input).expect("should parse");
        assert_eq!(manifest.service, "orders");
        assert_eq!(manifest.stage(), "prod");
        assert_eq!(manifest.functions.len(), 2);

        let api = &manifest.functions["api"];
        assert_eq!(manifest.runtime_of(api), "python3.9");
        assert!(api.extra.contains_key("events"));

        let worker = &manifest.functions["worker"];
        assert_eq!(manifest.runtime_of(worker), "python3.8");
        assert_eq!(
            worker.layers.as_deref(),
            Some(&[LayerRef::Intrinsic(Intrinsic::reference("SharedLayer"))][..])
        );
        assert!(manifest.custom.pydeps.is_some());
    }

    #[test]
    fn parses_minimal_manifest() {
        let manifest = parse_manifest_str(r#"service = "orders""#).expect("should parse");
        assert_eq!(manifest.stage(), DEFAULT_STAGE);
        assert_eq!(manifest.provider.name, "aws");
        assert!(manifest.functions.is_empty());
    }

    #[test]
    fn functions_keep_declaration_order() {
        let manifest = parse_manifest_str(
            r#"
service = "orders"
[functions.zeta]
handler = "z.handler"
[functions.alpha]
handler = "a.handler"
"#,
        )
        .unwrap();
        let names: Vec<&str> = manifest.functions.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn runtime_falls_back_to_host_default() {
        let manifest = parse_manifest_str(
            r#"
service = "orders"
[functions.api]
handler = "api.handler"
"#,
        )
        .unwrap();
        assert_eq!(
            manifest.runtime_of(&manifest.functions["api"]),
            DEFAULT_RUNTIME
        );
    }

    #[test]
    fn rejects_missing_service() {
        assert!(parse_manifest_str("[provider]\nname = \"aws\"\n").is_err());
    }

    #[test]
    fn rejects_invalid_stage_characters() {
        let err = parse_manifest_str(
            r#"
service = "orders"
[provider]
stage = "prod_eu"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::InvalidName { field: "stage", .. }));
    }

    #[test]
    fn rejects_other_providers() {
        let err = parse_manifest_str(
            r#"
service = "orders"
[provider]
name = "gcp"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::UnsupportedProvider(_)));
    }

    #[test]
    fn parses_manifest_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pydeps.toml");
        fs::write(&path, "service = \"orders\"\n").unwrap();
        assert_eq!(parse_manifest_file(&path).unwrap().service, "orders");
    }
}
