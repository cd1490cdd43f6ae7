//! # Path Planner
//!
//! Deterministic location of a resource inside the working copy.

use crate::constants::CLUSTER_SCOPED_PLACEHOLDER;

/// Relative path for one exported resource: `{namespace}/{kind}/{name}.yaml`
///
/// Cluster-scoped resources (empty namespace) land under
/// [`CLUSTER_SCOPED_PLACEHOLDER`]. The extension is fixed regardless of the
/// output format so files keep their location when the format changes.
pub fn resource_path(namespace: &str, kind: &str, name: &str) -> String {
    let namespace = if namespace.is_empty() {
        CLUSTER_SCOPED_PLACEHOLDER
    } else {
        namespace
    };
    format!("{namespace}/{kind}/{name}.yaml")
}
