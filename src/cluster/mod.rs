//! # Cluster Access
//!
//! Read-only view of the cluster used by the export pipeline.
//!
//! The engine only ever talks to a [`ClusterProvider`]; [`KubeClusterProvider`]
//! is the API-server backed implementation. Tests substitute an in-memory one.

use anyhow::Result;
use async_trait::async_trait;
use kube::core::{ApiResource, GroupVersionKind};

mod kube_provider;

pub use kube_provider::KubeClusterProvider;

/// One live object as returned by the API server
pub type ResourceRecord = serde_json::Value;

/// Everything needed to list one resource type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestMapping {
    pub gvk: GroupVersionKind,
    /// Lower-case plural used in the REST path (e.g. `deployments`)
    pub plural: String,
    /// Whether objects of this type live inside a namespace
    pub namespaced: bool,
}

impl RestMapping {
    pub fn new(gvk: GroupVersionKind, plural: impl Into<String>, namespaced: bool) -> Self {
        Self {
            gvk,
            plural: plural.into(),
            namespaced,
        }
    }

    /// `group/version`, or just `version` for the core group
    pub fn api_version(&self) -> String {
        self.gvk.api_version()
    }

    pub fn kind(&self) -> &str {
        &self.gvk.kind
    }

    /// Dynamic API descriptor for this mapping
    pub fn api_resource(&self) -> ApiResource {
        ApiResource::from_gvk_with_plural(&self.gvk, &self.plural)
    }
}

impl std::fmt::Display for RestMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.plural, self.api_version())
    }
}

/// Source of discovery information and live objects
#[async_trait]
pub trait ClusterProvider: Send + Sync {
    /// Map a group/version/kind to a listable resource
    async fn discover(&self, gvk: &GroupVersionKind) -> Result<RestMapping>;

    /// List every object of `mapping` in `namespace`
    ///
    /// An empty namespace lists across the whole cluster. Pagination is the
    /// provider's concern: the returned set is complete.
    async fn list(&self, mapping: &RestMapping, namespace: &str) -> Result<Vec<ResourceRecord>>;

    /// Names of all namespaces currently present
    async fn list_namespaces(&self) -> Result<Vec<String>>;
}
