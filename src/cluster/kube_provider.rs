//! # Kubernetes Cluster Provider
//!
//! [`ClusterProvider`] backed by the API server: discovery through
//! `kube::discovery`, listing through dynamic `Api<DynamicObject>` handles.

use super::{ClusterProvider, ResourceRecord, RestMapping};
use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::{
    api::{Api, DynamicObject, ListParams},
    core::{GroupVersionKind, TypeMeta},
    discovery::{self, Scope},
    Client,
};
use tracing::debug;

/// Cluster access through a kube [`Client`]
#[derive(Clone)]
pub struct KubeClusterProvider {
    client: Client,
    page_size: u32,
}

impl std::fmt::Debug for KubeClusterProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClusterProvider")
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl KubeClusterProvider {
    pub fn new(client: Client, page_size: u32) -> Self {
        Self { client, page_size }
    }

    fn dynamic_api(&self, mapping: &RestMapping, namespace: &str) -> Api<DynamicObject> {
        let resource = mapping.api_resource();
        if namespace.is_empty() || !mapping.namespaced {
            Api::all_with(self.client.clone(), &resource)
        } else {
            Api::namespaced_with(self.client.clone(), namespace, &resource)
        }
    }
}

#[async_trait]
impl ClusterProvider for KubeClusterProvider {
    async fn discover(&self, gvk: &GroupVersionKind) -> Result<RestMapping> {
        let (resource, capabilities) = discovery::pinned_kind(&self.client, gvk)
            .await
            .with_context(|| format!("discovery of {}/{} failed", gvk.api_version(), gvk.kind))?;
        Ok(RestMapping::new(
            gvk.clone(),
            resource.plural,
            capabilities.scope == Scope::Namespaced,
        ))
    }

    async fn list(&self, mapping: &RestMapping, namespace: &str) -> Result<Vec<ResourceRecord>> {
        let api = self.dynamic_api(mapping, namespace);
        // List items usually omit apiVersion/kind; restore them so manifests are self-describing
        let types = TypeMeta {
            api_version: mapping.api_version(),
            kind: mapping.kind().to_string(),
        };

        let mut params = ListParams::default().limit(self.page_size);
        let mut records = Vec::new();
        let mut pages = 0usize;
        loop {
            let page = api
                .list(&params)
                .await
                .with_context(|| format!("list request for {mapping} failed"))?;
            pages += 1;
            for mut object in page.items {
                if object.types.is_none() {
                    object.types = Some(types.clone());
                }
                records.push(serde_json::to_value(&object)?);
            }
            match page.metadata.continue_ {
                Some(token) if !token.is_empty() => params = params.continue_token(&token),
                _ => break,
            }
        }

        debug!(
            resource = %mapping,
            namespace = namespace,
            pages = pages,
            count = records.len(),
            "Listed resources"
        );
        Ok(records)
    }

    async fn list_namespaces(&self) -> Result<Vec<String>> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let mut params = ListParams::default().limit(self.page_size);
        let mut names = Vec::new();
        loop {
            let page = api.list(&params).await.context("failed to list namespaces")?;
            names.extend(page.items.into_iter().filter_map(|ns| ns.metadata.name));
            match page.metadata.continue_ {
                Some(token) if !token.is_empty() => params = params.continue_token(&token),
                _ => break,
            }
        }
        Ok(names)
    }
}
