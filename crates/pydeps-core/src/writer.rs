use crate::synth::DependencyResourceSet;
use pydeps_schema::{LogicalId, Template};
use tracing::debug;

/// Merge a resource set into the host template, replacing same-id entries.
/// Returns the logical ids written, in write order.
pub fn write_resource_set(template: &mut Template, set: DependencyResourceSet) -> Vec<LogicalId> {
    let mut written = Vec::with_capacity(5);
    for (id, resource) in set.into_resources() {
        if let Some(previous) = template.insert(id.clone(), resource) {
            debug!(
                "replaced existing {} resource {id}",
                previous.resource_type()
            );
        }
        written.push(id);
    }
    written
}
