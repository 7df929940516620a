use crate::context::DeploymentContext;
use crate::naming::layer_id;
use pydeps_schema::{Intrinsic, LayerRef, RuntimeTag, ServiceManifest};
use std::collections::BTreeMap;
use tracing::debug;

/// A function whose runtime needs the dependency layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifyingFunction {
    pub name: String,
    pub tag: RuntimeTag,
}

/// Result of a read-only pass over the manifest's functions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// Qualifying functions in manifest order.
    pub functions: Vec<QualifyingFunction>,
    /// Distinct tags, each with the raw runtime string its packager runs on.
    pub runtimes: BTreeMap<RuntimeTag, String>,
}

impl ScanResult {
    pub fn is_empty(&self) -> bool {
        self.runtimes.is_empty()
    }

    pub fn tags(&self) -> impl Iterator<Item = &RuntimeTag> {
        self.runtimes.keys()
    }

    pub fn raw_runtime(&self, tag: &RuntimeTag) -> Option<&str> {
        self.runtimes.get(tag).map(String::as_str)
    }
}

/// Classify every function once, in manifest order, and collect the qualifying ones.
///
/// The manifest is not touched; layers are attached separately by
/// [`attach_layers`] once the requirements are known to be loadable.
pub fn scan_functions(manifest: &ServiceManifest, ctx: &DeploymentContext) -> ScanResult {
    let mut result = ScanResult::default();

    for (name, function) in &manifest.functions {
        let raw = manifest.runtime_of(function);
        let Some(tag) = ctx.qualifying_tag(raw) else {
            continue;
        };
        result
            .runtimes
            .entry(tag.clone())
            .or_insert_with(|| raw.to_owned());
        result.functions.push(QualifyingFunction {
            name: name.clone(),
            tag,
        });
    }

    // Prefer the provider's spelling of a runtime when it maps to the same tag.
    if let Some(provider_runtime) = manifest.provider.runtime.as_deref() {
        if let Some(tag) = ctx.qualifying_tag(provider_runtime) {
            if let Some(raw) = result.runtimes.get_mut(&tag) {
                provider_runtime.clone_into(raw);
            }
        }
    }

    result
}

/// Append the per-runtime dependency layer to every qualifying function.
///
/// A function keeps its own layer list if it has one; otherwise it starts
/// from a copy of the provider's default list (the provider list itself is
/// never modified), or from an empty list. Returns the names of the
/// functions that were changed.
pub fn attach_layers(manifest: &mut ServiceManifest, scan: &ScanResult) -> Vec<String> {
    let defaults = manifest.provider.layers.clone();
    let mut attached = Vec::with_capacity(scan.functions.len());

    for qualifying in &scan.functions {
        let Some(function) = manifest.functions.get_mut(&qualifying.name) else {
            continue;
        };
        let layer = LayerRef::Intrinsic(Intrinsic::reference(layer_id(&qualifying.tag)));
        let layers = function
            .layers
            .get_or_insert_with(|| defaults.clone().unwrap_or_default());

        if layers.contains(&layer) {
            debug!(
                "function {} already references the {} dependency layer",
                qualifying.name, qualifying.tag
            );
            continue;
        }
        layers.push(layer);
        debug!(
            "attached {} dependency layer to function {}",
            qualifying.tag, qualifying.name
        );
        attached.push(qualifying.name.clone());
    }

    attached
}
