//! Deterministic identifiers and names for the generated resources.
//!
//! Every name interpolates the service, the stage, the `pydeps` marker and the
//! runtime tag, so two runtimes or two stages never collide and re-running a
//! deployment yields byte-identical names. Names over a platform limit are
//! shortened with a blake3 suffix of the full name.

use pydeps_schema::{LogicalId, RuntimeTag};

pub const PYDEPS_MARKER: &str = "pydeps";

const FUNCTION_NAME_LIMIT: usize = 64;
const LAYER_NAME_LIMIT: usize = 140;
const ROLE_NAME_LIMIT: usize = 64;
/// Room left in role names for `${AWS::Region}` once substituted.
const REGION_RESERVE: usize = 16;
const HASH_SUFFIX_LEN: usize = 8;
const LOG_GROUP_PREFIX: &str = "/aws/lambda/";
const REGION_PLACEHOLDER: &str = "${AWS::Region}";

/// Logical id of the dependency layer for a runtime tag. Functions reference
/// this id, so it must not depend on anything but the tag.
pub fn layer_id(tag: &RuntimeTag) -> LogicalId {
    LogicalId::new(format!("{tag}DependenciesLayer"))
}

/// All identifiers and names of one runtime tag's resource set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNames {
    pub layer_id: LogicalId,
    pub log_group_id: LogicalId,
    pub role_id: LogicalId,
    pub packager_id: LogicalId,
    pub package_id: LogicalId,
    pub layer_name: String,
    pub packager_function_name: String,
    pub log_group_name: String,
    /// `Fn::Sub` template; the region is substituted at deploy time.
    pub role_name: String,
    pub policy_name: String,
    /// Object key prefix the packager may write under.
    pub key_prefix: String,
}

impl ResourceNames {
    pub fn new(service: &str, stage: &str, tag: &RuntimeTag) -> Self {
        let common = format!("{service}-{stage}");
        let packager_function_name = bounded(
            &format!("{common}-{PYDEPS_MARKER}-{tag}-packager"),
            FUNCTION_NAME_LIMIT,
        );
        let role_suffix = format!("-{tag}PackagerLambdaRole");
        let role_prefix_limit = ROLE_NAME_LIMIT
            .saturating_sub(REGION_RESERVE + 1)
            .saturating_sub(role_suffix.len());

        Self {
            layer_id: layer_id(tag),
            log_group_id: LogicalId::new(format!("{tag}DependenciesPackagerLogGroup")),
            role_id: LogicalId::new(format!("{tag}DependenciesPackagerRole")),
            packager_id: LogicalId::new(format!("{tag}DependenciesPackager")),
            package_id: LogicalId::new(format!("{tag}DependenciesPackage")),
            layer_name: bounded(
                &format!("{common}-{PYDEPS_MARKER}-{tag}"),
                LAYER_NAME_LIMIT,
            ),
            log_group_name: format!("{LOG_GROUP_PREFIX}{packager_function_name}"),
            packager_function_name,
            role_name: format!(
                "{}-{REGION_PLACEHOLDER}{role_suffix}",
                bounded(&common, role_prefix_limit)
            ),
            policy_name: format!("{common}-lambda"),
            key_prefix: format!("serverless/{service}/{stage}/{PYDEPS_MARKER}"),
        }
    }
}

/// Shorten `name` to at most `limit` characters, replacing the tail with `-`
/// and a hash of the full name so distinct long names stay distinct.
pub fn bounded(name: &str, limit: usize) -> String {
    if name.chars().count() <= limit {
        return name.to_owned();
    }
    let hash = blake3::hash(name.as_bytes()).to_hex();
    let suffix = &hash.as_str()[..HASH_SUFFIX_LEN];
    if limit <= HASH_SUFFIX_LEN + 1 {
        return suffix[..limit.min(HASH_SUFFIX_LEN)].to_owned();
    }
    let head: String = name.chars().take(limit - HASH_SUFFIX_LEN - 1).collect();
    format!("{}-{suffix}", head.trim_end_matches('-'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(s: &str) -> RuntimeTag {
        RuntimeTag::new(s)
    }

    #[test]
    fn names_follow_service_stage_marker_tag() {
        let names = ResourceNames::new("orders", "prod", &tag("Python39"));
        assert_eq!(names.layer_id, "Python39DependenciesLayer");
        assert_eq!(names.log_group_id, "Python39DependenciesPackagerLogGroup");
        assert_eq!(names.role_id, "Python39DependenciesPackagerRole");
        assert_eq!(names.packager_id, "Python39DependenciesPackager");
        assert_eq!(names.package_id, "Python39DependenciesPackage");
        assert_eq!(names.layer_name, "orders-prod-pydeps-Python39");
        assert_eq!(
            names.packager_function_name,
            "orders-prod-pydeps-Python39-packager"
        );
        assert_eq!(
            names.log_group_name,
            "/aws/lambda/orders-prod-pydeps-Python39-packager"
        );
        assert_eq!(
            names.role_name,
            "orders-prod-${AWS::Region}-Python39PackagerLambdaRole"
        );
        assert_eq!(names.policy_name, "orders-prod-lambda");
        assert_eq!(names.key_prefix, "serverless/orders/prod/pydeps");
    }

    #[test]
    fn names_are_stable_across_runs() {
        let a = ResourceNames::new("orders", "prod", &tag("Python38"));
        let b = ResourceNames::new("orders", "prod", &tag("Python38"));
        assert_eq!(a, b);
    }

    #[test]
    fn tags_and_stages_do_not_collide() {
        let p38 = ResourceNames::new("orders", "prod", &tag("Python38"));
        let p39 = ResourceNames::new("orders", "prod", &tag("Python39"));
        let dev = ResourceNames::new("orders", "dev", &tag("Python39"));
        assert_ne!(p38.layer_name, p39.layer_name);
        assert_ne!(p38.packager_function_name, p39.packager_function_name);
        assert_ne!(p39.layer_name, dev.layer_name);
        assert_ne!(p39.key_prefix, dev.key_prefix);
        assert_ne!(p39.role_name, dev.role_name);
    }

    #[test]
    fn long_names_are_bounded_and_distinct() {
        let service = "a-really-long-service-name-that-keeps-going";
        let a = ResourceNames::new(service, "staging-eu", &tag("Python39"));
        let b = ResourceNames::new(service, "staging-us", &tag("Python39"));

        assert!(a.packager_function_name.len() <= FUNCTION_NAME_LIMIT);
        assert_ne!(a.packager_function_name, b.packager_function_name);
        assert!(a.log_group_name.ends_with(&a.packager_function_name));

        let role_literal = a.role_name.replace(REGION_PLACEHOLDER, "");
        assert!(role_literal.len() + REGION_RESERVE <= ROLE_NAME_LIMIT);
        assert_ne!(a.role_name, b.role_name);
    }

    #[test]
    fn bounded_keeps_short_names() {
        assert_eq!(bounded("short", 64), "short");
        let long = "x".repeat(100);
        let out = bounded(&long, 20);
        assert_eq!(out.len(), 20);
        assert_eq!(out, bounded(&long, 20));
        assert_eq!(bounded(&long, 4).len(), 4);
    }
}
