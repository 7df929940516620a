use crate::context::DeploymentContext;
use crate::naming::ResourceNames;
use crate::requirements::Requirements;
use pydeps_schema::{
    DependencyPackageProperties, Effect, FunctionCode, FunctionProperties, InlinePolicy,
    Intrinsic, LayerContent, LayerVersionProperties, LogGroupProperties, LogicalId,
    PolicyDocument, Principal, Resource, ResourceProperties, RoleProperties, RuntimeTag,
    Statement,
};

/// Source of the packaging executor, identical for every runtime tag.
pub const PACKAGER_CODE: &str = include_str!("../assets/packager.py");
pub const PACKAGER_HANDLER: &str = "index.handler";

/// Attribute of the package resource holding the uploaded object key.
pub const PACKAGE_KEY_ATTRIBUTE: &str = "Key";

const LAMBDA_SERVICE: &str = "lambda.amazonaws.com";

/// The five resources that produce one runtime tag's dependency layer.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyResourceSet {
    pub tag: RuntimeTag,
    pub names: ResourceNames,
    pub log_group: Resource,
    pub role: Resource,
    pub packager: Resource,
    pub package: Resource,
    pub layer: Resource,
}

impl DependencyResourceSet {
    /// Resources keyed by logical id, in dependency order.
    pub fn into_resources(self) -> Vec<(LogicalId, Resource)> {
        let names = self.names;
        vec![
            (names.log_group_id, self.log_group),
            (names.role_id, self.role),
            (names.packager_id, self.packager),
            (names.package_id, self.package),
            (names.layer_id, self.layer),
        ]
    }
}

/// Build the resource chain for one runtime tag.
///
/// `raw_runtime` is the runtime string the packager executes on; it must be
/// the interpreter the tag's functions use so the packaged wheels match.
pub fn synthesize(
    ctx: &DeploymentContext,
    tag: &RuntimeTag,
    raw_runtime: &str,
    requirements: &Requirements,
) -> DependencyResourceSet {
    let names = ctx.names(tag);

    DependencyResourceSet {
        tag: tag.clone(),
        log_group: log_group(&names),
        role: role(ctx, &names),
        packager: packager(ctx, &names, raw_runtime),
        package: package(ctx, &names, requirements),
        layer: layer(ctx, &names, raw_runtime),
        names,
    }
}

fn log_group(names: &ResourceNames) -> Resource {
    Resource::new(ResourceProperties::LogGroup(LogGroupProperties {
        log_group_name: names.log_group_name.clone(),
    }))
}

fn role(ctx: &DeploymentContext, names: &ResourceNames) -> Resource {
    let trust = PolicyDocument::new(vec![Statement {
        effect: Effect::Allow,
        principal: Some(Principal {
            service: vec![LAMBDA_SERVICE.to_owned()],
        }),
        action: vec!["sts:AssumeRole".to_owned()],
        resource: Vec::new(),
    }]);

    // Never logs:CreateLogGroup; the group's lifetime is owned by the template.
    let logs = Statement {
        effect: Effect::Allow,
        principal: None,
        action: vec![
            "logs:CreateLogStream".to_owned(),
            "logs:PutLogEvents".to_owned(),
        ],
        resource: vec![Intrinsic::get_att(names.log_group_id.clone(), "Arn")],
    };
    let objects = Statement {
        effect: Effect::Allow,
        principal: None,
        action: vec!["s3:PutObject".to_owned(), "s3:DeleteObject".to_owned()],
        resource: vec![Intrinsic::sub(format!(
            "${{{}.Arn}}/{}/*",
            ctx.deployment_bucket, names.key_prefix
        ))],
    };

    Resource::new(ResourceProperties::Role(RoleProperties {
        assume_role_policy_document: trust,
        policies: vec![InlinePolicy {
            policy_name: names.policy_name.clone(),
            policy_document: PolicyDocument::new(vec![logs, objects]),
        }],
        path: "/".to_owned(),
        role_name: Intrinsic::sub(names.role_name.clone()),
    }))
}

fn packager(ctx: &DeploymentContext, names: &ResourceNames, raw_runtime: &str) -> Resource {
    Resource::new(ResourceProperties::Function(FunctionProperties {
        code: FunctionCode {
            zip_file: PACKAGER_CODE.to_owned(),
        },
        handler: PACKAGER_HANDLER.to_owned(),
        memory_size: ctx.config.memory_size,
        role: Intrinsic::get_att(names.role_id.clone(), "Arn"),
        runtime: raw_runtime.to_owned(),
        timeout: ctx.config.timeout,
        function_name: names.packager_function_name.clone(),
    }))
    .depends_on([names.log_group_id.clone()])
}

fn package(
    ctx: &DeploymentContext,
    names: &ResourceNames,
    requirements: &Requirements,
) -> Resource {
    Resource::new(ResourceProperties::DependencyPackage(
        DependencyPackageProperties {
            service_token: Intrinsic::get_att(names.packager_id.clone(), "Arn"),
            bucket: Intrinsic::reference(ctx.deployment_bucket.clone()),
            prefix: names.key_prefix.clone(),
            requirements: requirements.as_str().to_owned(),
        },
    ))
    .depends_on([names.log_group_id.clone(), names.packager_id.clone()])
}

fn layer(ctx: &DeploymentContext, names: &ResourceNames, raw_runtime: &str) -> Resource {
    Resource::new(ResourceProperties::LayerVersion(LayerVersionProperties {
        content: LayerContent {
            s3_bucket: Intrinsic::reference(ctx.deployment_bucket.clone()),
            s3_key: Intrinsic::get_att(names.package_id.clone(), PACKAGE_KEY_ATTRIBUTE),
        },
        layer_name: names.layer_name.clone(),
        description: ctx.config.description.clone(),
        compatible_runtimes: vec![raw_runtime.to_owned()],
    }))
}
