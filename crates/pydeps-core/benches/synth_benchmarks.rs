use criterion::{criterion_group, criterion_main, Criterion};
use pydeps_core::{Augmenter, DeploymentContext, StaticRequirements};
use pydeps_schema::{parse_manifest_str, ServiceManifest, Template};
use std::fmt::Write;

fn manifest_with_functions(count: usize) -> ServiceManifest {
    let mut input = String::from("service = \"bench\"\n");
    for i in 0..count {
        let runtime = ["python3.8", "python3.9", "python3.11", "nodejs18.x"][i % 4];
        write!(
            input,
            "[functions.f{i}]\nhandler = \"f{i}.handler\"\nruntime = \"{runtime}\"\n"
        )
        .unwrap();
    }
    parse_manifest_str(&input).unwrap()
}

fn bench_augment(c: &mut Criterion) {
    let requirements = StaticRequirements::new("requests==2.31.0\nurllib3==2.0.7\n");
    c.bench_function("augment_100_functions", |b| {
        b.iter_with_setup(
            || {
                let manifest = manifest_with_functions(100);
                let ctx = DeploymentContext::from_manifest(&manifest).unwrap();
                (manifest, Template::new(), Augmenter::new(ctx))
            },
            |(mut manifest, mut template, augmenter)| {
                augmenter
                    .augment(&mut manifest, &mut template, &requirements)
                    .unwrap();
            },
        );
    });
}

fn bench_template_json(c: &mut Criterion) {
    let mut manifest = manifest_with_functions(100);
    let ctx = DeploymentContext::from_manifest(&manifest).unwrap();
    let mut template = Template::new();
    Augmenter::new(ctx)
        .augment(
            &mut manifest,
            &mut template,
            &StaticRequirements::new("requests==2.31.0\n"),
        )
        .unwrap();

    c.bench_function("template_to_json_3_runtimes", |b| {
        b.iter(|| template.to_json_pretty().unwrap());
    });
}

criterion_group!(benches, bench_augment, bench_template_json);
criterion_main!(benches);
