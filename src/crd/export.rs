//! # ExportConfig
//!
//! Tenant configuration: which resources to export and into which git target.

use crate::crd::ResourceFilter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// ExportConfig Custom Resource Definition
///
/// Selects live resources and names the `GitConfig` (in the same namespace) that
/// receives them.
///
/// # Example
///
/// ```yaml
/// apiVersion: versioner.kube-versioner.io/v1alpha1
/// kind: ExportConfig
/// metadata:
///   name: platform-workloads
///   namespace: versioner
/// spec:
///   namespace: all
///   includeResource:
///     - name: Deployment
///       apiVersion: apps/v1
///     - name: ConfigMap
///       apiVersion: v1
///   excludeResource:
///     - name: ConfigMap
///       apiVersion: v1
///       resourceName: kube-root-ca.crt
///   labels:
///     app.kubernetes.io/part-of: platform
///   outputType: yaml
///   gitRef: audit-repo
///   folderStructure: "{namespace}/{kind}/{name}"
/// ```
#[derive(
    kube::CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, schemars::JsonSchema,
)]
#[kube(
    kind = "ExportConfig",
    group = "versioner.kube-versioner.io",
    version = "v1alpha1",
    namespaced,
    shortname = "exc",
    printcolumn = r#"{"name":"GitRef", "type":"string", "jsonPath":".spec.gitRef"}, {"name":"Namespace", "type":"string", "jsonPath":".spec.namespace"}, {"name":"Output", "type":"string", "jsonPath":".spec.outputType"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ExportConfigSpec {
    /// Namespace selector
    /// `*` or `all` exports from every namespace, an empty string exports cluster-wide
    /// without namespace partitioning, anything else is a single namespace
    pub namespace: String,
    /// Resource types to export
    #[serde(default)]
    pub include_resource: Vec<ResourceFilter>,
    /// Resource types or individual objects to leave out
    #[serde(default)]
    pub exclude_resource: Vec<ResourceFilter>,
    /// Every label listed here must be present on an object with the same value
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Every annotation listed here must be present on an object with the same value
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    /// Serialization format of exported manifests
    pub output_type: OutputType,
    /// Name of the GitConfig receiving the manifests
    pub git_ref: String,
    /// Layout of exported files
    /// Currently fixed to `{namespace}/{kind}/{name}.yaml`; the value is recorded but not interpreted
    pub folder_structure: String,
}

/// Serialization format for exported manifests
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    /// Block-style YAML
    #[default]
    Yaml,
    /// JSON indented with two spaces
    Json,
}

impl std::fmt::Display for OutputType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yaml => f.write_str("yaml"),
            Self::Json => f.write_str("json"),
        }
    }
}
