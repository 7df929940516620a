use crate::context::DeploymentContext;
use crate::requirements::RequirementsLoader;
use crate::scan::{attach_layers, scan_functions};
use crate::synth::synthesize;
use crate::writer::write_resource_set;
use crate::CoreError;
use pydeps_schema::{LogicalId, RuntimeTag, ServiceManifest, Template};
use tracing::info;

/// What a pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AugmentReport {
    /// One entry per synthesized resource set.
    pub runtime_tags: Vec<RuntimeTag>,
    /// Functions that received a dependency layer.
    pub functions: Vec<String>,
    /// Logical ids written into the template.
    pub resources: Vec<LogicalId>,
}

impl AugmentReport {
    /// True when no function needed a dependency layer.
    pub fn is_noop(&self) -> bool {
        self.runtime_tags.is_empty()
    }
}

/// Runs the dependency-layer pass over one deployment.
pub struct Augmenter {
    ctx: DeploymentContext,
}

impl Augmenter {
    pub fn new(ctx: DeploymentContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &DeploymentContext {
        &self.ctx
    }

    /// Attach dependency layers to every qualifying function and add the
    /// resources that build them to `template`.
    ///
    /// Nothing is loaded or written when no function qualifies. Requirements
    /// are loaded once, before any mutation, so a loader failure leaves both
    /// the manifest and the template untouched.
    pub fn augment(
        &self,
        manifest: &mut ServiceManifest,
        template: &mut Template,
        loader: &dyn RequirementsLoader,
    ) -> Result<AugmentReport, CoreError> {
        let scan = scan_functions(manifest, &self.ctx);
        if scan.is_empty() {
            info!("no functions need Python dependencies");
            return Ok(AugmentReport::default());
        }

        let requirements = loader.load()?;

        let mut report = AugmentReport {
            functions: attach_layers(manifest, &scan),
            ..AugmentReport::default()
        };

        for (tag, raw_runtime) in &scan.runtimes {
            info!("adding {tag} dependencies resource");
            let set = synthesize(&self.ctx, tag, raw_runtime, &requirements);
            report
                .resources
                .extend(write_resource_set(template, set));
            report.runtime_tags.push(tag.clone());
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requirements::{Requirements, RequirementsError, StaticRequirements};
    use pydeps_schema::parse_manifest_str;
    use std::cell::Cell;

    struct CountingLoader {
        calls: Cell<usize>,
        fail: bool,
    }

    impl CountingLoader {
        fn new(fail: bool) -> Self {
            Self {
                calls: Cell::new(0),
                fail,
            }
        }
    }

    impl RequirementsLoader for CountingLoader {
        fn load(&self) -> Result<Requirements, RequirementsError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                Err(RequirementsError::NoDependencies(".".into()))
            } else {
                Ok(Requirements::new("six==1.16.0\n"))
            }
        }
    }

    fn manifest(input: &str) -> ServiceManifest {
        parse_manifest_str(input).unwrap()
    }

    fn augmenter(manifest: &ServiceManifest) -> Augmenter {
        Augmenter::new(DeploymentContext::from_manifest(manifest).unwrap())
    }

    #[test]
    fn short_circuits_without_python_functions() {
        let mut manifest = manifest(
            r#"
service = "orders"
[functions.a]
handler = "a.handler"
runtime = "nodejs14.x"
"#,
        );
        let loader = CountingLoader::new(false);
        let mut template = Template::new();

        let report = augmenter(&manifest)
            .augment(&mut manifest, &mut template, &loader)
            .unwrap();
        assert!(report.is_noop());
        assert_eq!(loader.calls.get(), 0);
        assert!(template.is_empty());
    }

    #[test]
    fn loads_requirements_once_for_many_functions() {
        let mut manifest = manifest(
            r#"
service = "orders"
[provider]
runtime = "python3.9"
[functions.a]
handler = "a.handler"
[functions.b]
handler = "b.handler"
[functions.c]
handler = "c.handler"
runtime = "python3.8"
[functions.d]
handler = "d.handler"
runtime = "python3.8"
"#,
        );
        let loader = CountingLoader::new(false);
        let mut template = Template::new();

        let report = augmenter(&manifest)
            .augment(&mut manifest, &mut template, &loader)
            .unwrap();
        assert_eq!(loader.calls.get(), 1);
        assert_eq!(
            report.runtime_tags,
            vec![RuntimeTag::new("Python38"), RuntimeTag::new("Python39")]
        );
        assert_eq!(report.functions, vec!["a", "b", "c", "d"]);
        assert_eq!(template.len(), 10);
        assert_eq!(report.resources.len(), 10);
    }

    #[test]
    fn loader_failure_leaves_everything_untouched() {
        let mut manifest = manifest(
            r#"
service = "orders"
[functions.a]
handler = "a.handler"
runtime = "python3.9"
"#,
        );
        let before = manifest.clone();
        let mut template = Template::new();

        let err = augmenter(&manifest)
            .augment(&mut manifest, &mut template, &CountingLoader::new(true))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Requirements(RequirementsError::NoDependencies(_))
        ));
        assert_eq!(manifest, before);
        assert!(template.is_empty());
    }

    #[test]
    fn rerun_is_idempotent() {
        let input = r#"
service = "orders"
[functions.a]
handler = "a.handler"
runtime = "python3.9"
"#;
        let loader = StaticRequirements::new("six==1.16.0\n");

        let mut m1 = manifest(input);
        let mut t1 = Template::new();
        augmenter(&m1).augment(&mut m1, &mut t1, &loader).unwrap();

        let mut m2 = manifest(input);
        let mut t2 = Template::new();
        augmenter(&m2).augment(&mut m2, &mut t2, &loader).unwrap();

        assert_eq!(t1.to_json_pretty().unwrap(), t2.to_json_pretty().unwrap());
        assert_eq!(m1, m2);
    }

    #[test]
    fn lowercase_runtime_prefix_still_packages() {
        let mut manifest = manifest(
            r#"
service = "orders"
[custom.pydeps]
runtime_prefix = "python"
[functions.a]
handler = "a.handler"
runtime = "python3.9"
"#,
        );
        let mut template = Template::new();

        let report = augmenter(&manifest)
            .augment(
                &mut manifest,
                &mut template,
                &StaticRequirements::new("six==1.16.0\n"),
            )
            .unwrap();
        assert!(!report.is_noop());
        assert_eq!(report.resources.len(), 5);
        assert_eq!(report.functions, vec!["a"]);
        assert!(manifest.functions["a"].layers.is_some());
    }
}
