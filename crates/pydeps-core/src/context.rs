use crate::config::PydepsConfig;
use crate::naming::ResourceNames;
use crate::CoreError;
use pydeps_schema::{classify_runtime, validate_name, LogicalId, RuntimeTag, ServiceManifest};

/// Logical id of the bucket the host creates for deployment artifacts.
pub const DEPLOYMENT_BUCKET_ID: &str = "ServerlessDeploymentBucket";

/// Everything one deployment pass needs to know about where it is deploying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentContext {
    pub service: String,
    pub stage: String,
    pub deployment_bucket: LogicalId,
    pub config: PydepsConfig,
}

impl DeploymentContext {
    /// Build the context from a manifest's service, stage and `[custom.pydeps]` section.
    pub fn from_manifest(manifest: &ServiceManifest) -> Result<Self, CoreError> {
        manifest.validate()?;
        Ok(Self {
            service: manifest.service.clone(),
            stage: manifest.stage().to_owned(),
            deployment_bucket: LogicalId::new(DEPLOYMENT_BUCKET_ID),
            config: PydepsConfig::from_manifest(manifest)?,
        })
    }

    /// Override the stage, as a `--stage` option on the host would.
    pub fn with_stage(mut self, stage: &str) -> Result<Self, CoreError> {
        validate_name("stage", stage)?;
        if stage.is_empty() {
            return Err(CoreError::Manifest(pydeps_schema::ManifestError::EmptyStage));
        }
        self.stage = stage.to_owned();
        Ok(self)
    }

    #[must_use]
    pub fn with_deployment_bucket(mut self, id: impl Into<LogicalId>) -> Self {
        self.deployment_bucket = id.into();
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: PydepsConfig) -> Self {
        self.config = config;
        self
    }

    /// Classify a raw runtime, returning the tag only if it needs a dependency layer.
    pub fn qualifying_tag(&self, raw_runtime: &str) -> Option<RuntimeTag> {
        let tag = classify_runtime(raw_runtime);
        tag.is_family(&self.config.runtime_family()).then_some(tag)
    }

    pub fn names(&self, tag: &RuntimeTag) -> ResourceNames {
        ResourceNames::new(&self.service, &self.stage, tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pydeps_schema::parse_manifest_str;

    fn context() -> DeploymentContext {
        let manifest = parse_manifest_str(
            r#"
service = "orders"
[provider]
stage = "prod"
"#,
        )
        .unwrap();
        DeploymentContext::from_manifest(&manifest).unwrap()
    }

    #[test]
    fn reads_service_and_stage() {
        let ctx = context();
        assert_eq!(ctx.service, "orders");
        assert_eq!(ctx.stage, "prod");
        assert_eq!(ctx.deployment_bucket, DEPLOYMENT_BUCKET_ID);
    }

    #[test]
    fn stage_override_changes_names() {
        let ctx = context().with_stage("qa").unwrap();
        let names = ctx.names(&RuntimeTag::new("Python39"));
        assert_eq!(names.key_prefix, "serverless/orders/qa/pydeps");
    }

    #[test]
    fn stage_override_is_validated() {
        assert!(context().with_stage("qa/eu").is_err());
        assert!(context().with_stage("").is_err());
    }

    #[test]
    fn only_python_runtimes_qualify() {
        let ctx = context();
        assert_eq!(
            ctx.qualifying_tag("python3.9"),
            Some(RuntimeTag::new("Python39"))
        );
        assert_eq!(ctx.qualifying_tag("nodejs14.x"), None);
        assert_eq!(ctx.qualifying_tag("provided.al2"), None);
    }

    #[test]
    fn lowercase_prefix_from_with_config_still_qualifies() {
        let ctx = context().with_config(PydepsConfig {
            runtime_prefix: "python".to_owned(),
            ..PydepsConfig::default()
        });
        assert_eq!(
            ctx.qualifying_tag("python3.11"),
            Some(RuntimeTag::new("Python311"))
        );
    }
}
