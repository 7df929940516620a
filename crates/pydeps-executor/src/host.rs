//! In-process stand-in for the orchestrator that deploys a finished template.
//!
//! `HostOrchestrator` orders resources by their explicit and implied
//! dependencies, assigns physical ids and attributes, resolves intrinsic
//! references, and hands every packaging custom resource to a registered
//! [`PackagingExecutor`], waiting for its answer before moving on. Updates
//! skip custom resources whose resolved inputs did not change, and replaced
//! or removed artifacts get a Delete request in the cleanup phase.

use crate::contract::{PackagingProperties, PackagingRequest};
use crate::executor::PackagingExecutor;
use crate::ProvisionError;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use pydeps_schema::{
    DependencyPackageProperties, Intrinsic, LogicalId, Resource, ResourceProperties, Template,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_ACCOUNT_ID: &str = "123456789012";

const FUNCTION_NAME_LIMIT: usize = 64;
const ROLE_NAME_LIMIT: usize = 64;
const LAYER_NAME_LIMIT: usize = 140;

/// State of one deployed resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedResource {
    pub resource_type: String,
    pub physical_id: String,
    pub attributes: BTreeMap<String, String>,
    /// Resolved inputs of a custom resource, compared on update.
    pub custom_properties: Option<PackagingProperties>,
    /// Packager that owns a custom resource.
    pub service_token: Option<LogicalId>,
}

/// Result of provisioning a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionedStack {
    pub order: Vec<LogicalId>,
    pub resources: BTreeMap<LogicalId, ProvisionedResource>,
    /// Executor invocations made by the pass that produced this stack.
    pub invocations: usize,
}

impl ProvisionedStack {
    pub fn get(&self, id: &str) -> Option<&ProvisionedResource> {
        self.resources.get(id)
    }

    pub fn attribute(&self, id: &str, attribute: &str) -> Option<&str> {
        self.get(id)
            .and_then(|r| r.attributes.get(attribute))
            .map(String::as_str)
    }
}

pub struct HostOrchestrator {
    region: String,
    account_id: String,
    executors: HashMap<LogicalId, Arc<dyn PackagingExecutor>>,
}

impl Default for HostOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl HostOrchestrator {
    pub fn new() -> Self {
        Self {
            region: DEFAULT_REGION.to_owned(),
            account_id: DEFAULT_ACCOUNT_ID.to_owned(),
            executors: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_region(mut self, region: &str) -> Self {
        region.clone_into(&mut self.region);
        self
    }

    /// Bind the executor that runs behind the packager function `packager`.
    pub fn register(&mut self, packager: impl Into<LogicalId>, executor: Arc<dyn PackagingExecutor>) {
        self.executors.insert(packager.into(), executor);
    }

    /// Topological order of the template. Nodes and edges enter the graph in
    /// template order, so the order is stable for a given template.
    pub fn deployment_order(&self, template: &Template) -> Result<Vec<LogicalId>, ProvisionError> {
        let mut graph: DiGraph<LogicalId, ()> = DiGraph::with_capacity(template.len(), 0);
        let nodes: HashMap<&str, NodeIndex> = template
            .resources
            .keys()
            .map(|id| (id.as_str(), graph.add_node(id.clone())))
            .collect();

        // Edges point from a dependency to its dependent.
        for (id, resource) in template.iter() {
            let dependent = nodes[id.as_str()];
            for dep in dependencies(resource) {
                let Some(&dependency) = nodes.get(dep.as_str()) else {
                    return Err(ProvisionError::UnknownReference {
                        from: id.clone(),
                        to: dep,
                    });
                };
                graph.add_edge(dependency, dependent, ());
            }
        }

        let sorted = toposort(&graph, None)
            .map_err(|cycle| ProvisionError::Cycle(graph[cycle.node_id()].clone()))?;
        Ok(sorted.into_iter().map(|idx| graph[idx].clone()).collect())
    }

    /// Create every resource of a fresh stack.
    pub fn provision(&self, template: &Template) -> Result<ProvisionedStack, ProvisionError> {
        self.update(&ProvisionedStack::default(), template)
    }

    /// Bring `previous` in line with `template`.
    pub fn update(
        &self,
        previous: &ProvisionedStack,
        template: &Template,
    ) -> Result<ProvisionedStack, ProvisionError> {
        let order = self.deployment_order(template)?;
        let mut stack = ProvisionedStack {
            order: order.clone(),
            ..ProvisionedStack::default()
        };

        for id in &order {
            let Some(resource) = template.get(id) else {
                continue;
            };
            let old = previous.get(id);
            let provisioned = match &resource.properties {
                ResourceProperties::DependencyPackage(props) => {
                    self.provision_package(id, props, old, &mut stack)?
                }
                _ => self.provision_plain(id, resource, old, &stack)?,
            };
            debug!("provisioned {id} as {}", provisioned.physical_id);
            stack.resources.insert(id.clone(), provisioned);
        }

        // Cleanup: artifacts whose custom resource was replaced or removed.
        for id in previous.order.iter().rev() {
            let Some(old) = previous.get(id) else {
                continue;
            };
            let replaced = !stack
                .get(id)
                .is_some_and(|new| new.physical_id == old.physical_id);
            if replaced && old.custom_properties.is_some() {
                self.delete_custom(id, old)?;
                stack.invocations += 1;
            }
        }

        Ok(stack)
    }

    /// Tear down a stack in reverse order, deleting packaged artifacts.
    pub fn delete_stack(&self, stack: &ProvisionedStack) -> Result<(), ProvisionError> {
        for id in stack.order.iter().rev() {
            if let Some(resource) = stack.get(id) {
                if resource.custom_properties.is_some() {
                    self.delete_custom(id, resource)?;
                }
            }
        }
        Ok(())
    }

    fn delete_custom(&self, id: &LogicalId, old: &ProvisionedResource) -> Result<(), ProvisionError> {
        let (Some(token), Some(props)) = (&old.service_token, &old.custom_properties) else {
            return Ok(());
        };
        let executor = self.executor(token)?;
        let request =
            PackagingRequest::delete(id.clone(), old.physical_id.clone(), props.clone());
        let response = executor.handle(&request);
        if response.is_success() {
            Ok(())
        } else {
            let reason = response.reason.unwrap_or_default();
            warn!("delete of {id} failed: {reason}");
            Err(ProvisionError::ResourceFailed {
                id: id.clone(),
                reason,
            })
        }
    }

    fn executor(&self, token: &LogicalId) -> Result<&Arc<dyn PackagingExecutor>, ProvisionError> {
        self.executors
            .get(token)
            .ok_or_else(|| ProvisionError::NoExecutor(token.clone()))
    }

    fn provision_package(
        &self,
        id: &LogicalId,
        props: &DependencyPackageProperties,
        old: Option<&ProvisionedResource>,
        stack: &mut ProvisionedStack,
    ) -> Result<ProvisionedResource, ProvisionError> {
        let Intrinsic::GetAtt(token, _) = &props.service_token else {
            return Err(ProvisionError::InvalidProperty {
                id: id.clone(),
                reason: "ServiceToken must be Fn::GetAtt of a function".to_owned(),
            });
        };
        self.resolve(id, &props.service_token, stack)?;
        let executor = self.executor(token)?;

        let resolved = PackagingProperties {
            bucket: self.resolve(id, &props.bucket, stack)?,
            prefix: props.prefix.clone(),
            requirements: props.requirements.clone(),
        };

        let request = match old {
            Some(old) if old.custom_properties.as_ref() == Some(&resolved) => {
                debug!("{id} unchanged, skipping executor");
                return Ok(old.clone());
            }
            Some(ProvisionedResource {
                physical_id,
                custom_properties: Some(old_props),
                ..
            }) => PackagingRequest::update(
                id.clone(),
                physical_id.clone(),
                resolved.clone(),
                old_props.clone(),
            ),
            _ => PackagingRequest::create(id.clone(), resolved.clone()),
        };

        info!(
            "invoking {} executor for {id} ({:?})",
            executor.name(),
            request.request_type
        );
        stack.invocations += 1;
        let response = executor.handle(&request);
        if !response.is_success() {
            let reason = response.reason.unwrap_or_default();
            warn!("{id} failed: {reason}");
            return Err(ProvisionError::ResourceFailed {
                id: id.clone(),
                reason,
            });
        }
        let key = response
            .data
            .key
            .ok_or_else(|| ProvisionError::ResourceFailed {
                id: id.clone(),
                reason: "response carries no Key".to_owned(),
            })?;

        Ok(ProvisionedResource {
            resource_type: pydeps_schema::template::DEPENDENCY_PACKAGE_TYPE.to_owned(),
            physical_id: response.physical_resource_id,
            attributes: BTreeMap::from([("Key".to_owned(), key)]),
            custom_properties: Some(resolved),
            service_token: Some(token.clone()),
        })
    }

    fn provision_plain(
        &self,
        id: &LogicalId,
        resource: &Resource,
        old: Option<&ProvisionedResource>,
        stack: &ProvisionedStack,
    ) -> Result<ProvisionedResource, ProvisionError> {
        let mut attributes = BTreeMap::new();
        let physical_id = match &resource.properties {
            ResourceProperties::LogGroup(props) => {
                attributes.insert(
                    "Arn".to_owned(),
                    format!(
                        "arn:aws:logs:{}:{}:log-group:{}:*",
                        self.region, self.account_id, props.log_group_name
                    ),
                );
                props.log_group_name.clone()
            }
            ResourceProperties::Role(props) => {
                let name = self.resolve(id, &props.role_name, stack)?;
                check_len(id, "RoleName", &name, ROLE_NAME_LIMIT)?;
                for statement in props.policies.iter().flat_map(|p| &p.policy_document.statement) {
                    for target in &statement.resource {
                        self.resolve(id, target, stack)?;
                    }
                }
                attributes.insert(
                    "Arn".to_owned(),
                    format!("arn:aws:iam::{}:role{}{name}", self.account_id, props.path),
                );
                name
            }
            ResourceProperties::Function(props) => {
                check_len(id, "FunctionName", &props.function_name, FUNCTION_NAME_LIMIT)?;
                self.resolve(id, &props.role, stack)?;
                attributes.insert(
                    "Arn".to_owned(),
                    format!(
                        "arn:aws:lambda:{}:{}:function:{}",
                        self.region, self.account_id, props.function_name
                    ),
                );
                props.function_name.clone()
            }
            ResourceProperties::LayerVersion(props) => {
                check_len(id, "LayerName", &props.layer_name, LAYER_NAME_LIMIT)?;
                let bucket = self.resolve(id, &props.content.s3_bucket, stack)?;
                let key = self.resolve(id, &props.content.s3_key, stack)?;
                let unchanged = old.is_some_and(|o| {
                    o.attributes.get("S3Bucket") == Some(&bucket)
                        && o.attributes.get("S3Key") == Some(&key)
                });
                let version = match old {
                    Some(o) if unchanged => version_of(&o.physical_id),
                    Some(o) => version_of(&o.physical_id) + 1,
                    None => 1,
                };
                let arn = format!(
                    "arn:aws:lambda:{}:{}:layer:{}:{version}",
                    self.region, self.account_id, props.layer_name
                );
                attributes.insert("S3Bucket".to_owned(), bucket);
                attributes.insert("S3Key".to_owned(), key);
                attributes.insert("LayerVersionArn".to_owned(), arn.clone());
                arn
            }
            ResourceProperties::DependencyPackage(_) => {
                return Err(ProvisionError::InvalidProperty {
                    id: id.clone(),
                    reason: "custom resource provisioned as plain resource".to_owned(),
                });
            }
            ResourceProperties::Other(other) => {
                for dep in resource.implicit_references() {
                    self.resolve(id, &Intrinsic::Ref(dep), stack)?;
                }
                if other.resource_type == "AWS::S3::Bucket" {
                    let name = other
                        .properties
                        .get("BucketName")
                        .and_then(|v| v.as_str())
                        .map_or_else(|| generated_bucket_name(id), str::to_owned);
                    attributes.insert("Arn".to_owned(), format!("arn:aws:s3:::{name}"));
                    name
                } else {
                    id.to_string()
                }
            }
        };

        Ok(ProvisionedResource {
            resource_type: resource.resource_type().to_owned(),
            physical_id,
            attributes,
            custom_properties: None,
            service_token: None,
        })
    }

    fn resolve(
        &self,
        id: &LogicalId,
        reference: &Intrinsic,
        stack: &ProvisionedStack,
    ) -> Result<String, ProvisionError> {
        let unresolved = |what: String| ProvisionError::Unresolved {
            id: id.clone(),
            reference: what,
        };
        match reference {
            Intrinsic::Ref(target) => self
                .pseudo(target)
                .or_else(|| stack.get(target).map(|r| r.physical_id.clone()))
                .ok_or_else(|| unresolved(format!("Ref {target}"))),
            Intrinsic::GetAtt(target, attribute) => stack
                .attribute(target, attribute)
                .map(str::to_owned)
                .ok_or_else(|| unresolved(format!("{target}.{attribute}"))),
            Intrinsic::Sub(template) => {
                let mut out = String::with_capacity(template.len());
                let mut rest = template.as_str();
                while let Some(start) = rest.find("${") {
                    out.push_str(&rest[..start]);
                    let after = &rest[start + 2..];
                    let Some(end) = after.find('}') else {
                        return Err(unresolved(format!("unterminated placeholder in {template}")));
                    };
                    let name = after[..end].trim();
                    if let Some(literal) = name.strip_prefix('!') {
                        out.push_str("${");
                        out.push_str(literal);
                        out.push('}');
                    } else {
                        let inner = match name.split_once('.') {
                            Some((target, attribute)) => Intrinsic::get_att(target, attribute),
                            None => Intrinsic::reference(name),
                        };
                        out.push_str(&self.resolve(id, &inner, stack)?);
                    }
                    rest = &after[end + 1..];
                }
                out.push_str(rest);
                Ok(out)
            }
        }
    }

    fn pseudo(&self, name: &str) -> Option<String> {
        match name {
            "AWS::Region" => Some(self.region.clone()),
            "AWS::AccountId" => Some(self.account_id.clone()),
            "AWS::Partition" => Some("aws".to_owned()),
            _ => None,
        }
    }
}

fn dependencies(resource: &Resource) -> Vec<LogicalId> {
    let mut deps = resource.depends_on.clone();
    for id in resource.implicit_references() {
        if !id.starts_with("AWS::") && !deps.contains(&id) {
            deps.push(id);
        }
    }
    deps
}

fn check_len(id: &LogicalId, field: &str, value: &str, limit: usize) -> Result<(), ProvisionError> {
    if value.len() > limit {
        return Err(ProvisionError::InvalidProperty {
            id: id.clone(),
            reason: format!("{field} '{value}' is longer than {limit} characters"),
        });
    }
    Ok(())
}

fn version_of(layer_arn: &str) -> u64 {
    layer_arn
        .rsplit(':')
        .next()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

fn generated_bucket_name(id: &LogicalId) -> String {
    let hex = blake3::hash(id.as_bytes()).to_hex();
    format!("{}-{}", id.to_lowercase(), &hex.as_str()[..12])
}
