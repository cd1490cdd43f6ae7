//! # Resource Locator
//!
//! Resolves `(apiVersion, kind)` filters to listable resource mappings and
//! namespace selectors to concrete namespaces.
//!
//! Discovery results are cached for the lifetime of the process (bounded by an
//! optional TTL). Failures are never cached, so a kind that appears later (a CRD
//! installed after start-up) is picked up by the next pass.

use crate::cluster::{ClusterProvider, RestMapping};
use crate::constants::{ALL_NAMESPACES_SELECTORS, WILDCARD};
use crate::error::{ListError, LocateError};
use crate::observability::metrics;
use kube::core::GroupVersionKind;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
struct CachedMapping {
    mapping: RestMapping,
    resolved_at: Instant,
}

/// Discovery front-end with a shared mapping cache
pub struct ResourceLocator {
    provider: Arc<dyn ClusterProvider>,
    cache: RwLock<HashMap<GroupVersionKind, CachedMapping>>,
    ttl: Option<Duration>,
}

impl std::fmt::Debug for ResourceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLocator")
            .field("cached", &self.cached_len())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl ResourceLocator {
    /// `ttl` of `None` keeps mappings until [`ResourceLocator::invalidate`]
    pub fn new(provider: Arc<dyn ClusterProvider>, ttl: Option<Duration>) -> Self {
        Self {
            provider,
            cache: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Map a filter to a listable resource
    ///
    /// Empty or wildcard kinds and wildcard apiVersions are rejected before
    /// discovery is consulted.
    pub async fn resolve(&self, api_version: &str, kind: &str) -> Result<RestMapping, LocateError> {
        check_filter(api_version, kind)?;
        let gvk = parse_gvk(api_version, kind);

        if let Some(mapping) = self.cached(&gvk) {
            metrics::increment_discovery_lookups("hit");
            return Ok(mapping);
        }
        metrics::increment_discovery_lookups("miss");

        let mapping = self
            .provider
            .discover(&gvk)
            .await
            .map_err(|e| LocateError::Discovery {
                kind: kind.to_string(),
                api_version: api_version.to_string(),
                reason: format!("{e:#}"),
            })?;

        debug!(
            kind = kind,
            api_version = api_version,
            resource = %mapping,
            namespaced = mapping.namespaced,
            "Discovered resource mapping"
        );

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(
                gvk,
                CachedMapping {
                    mapping: mapping.clone(),
                    resolved_at: Instant::now(),
                },
            );
        }
        Ok(mapping)
    }

    /// Expand a tenant namespace selector
    ///
    /// - `*` / `all`: every namespace currently in the cluster, sorted
    /// - empty: a single empty entry meaning "no namespace partitioning"
    /// - anything else: that namespace only
    pub async fn resolve_namespaces(&self, selector: &str) -> Result<Vec<String>, ListError> {
        let selector = selector.trim();
        if ALL_NAMESPACES_SELECTORS.contains(&selector) {
            let mut namespaces =
                self.provider
                    .list_namespaces()
                    .await
                    .map_err(|e| ListError {
                        resource: "namespaces.v1".to_string(),
                        namespace: String::new(),
                        reason: format!("{e:#}"),
                    })?;
            namespaces.sort();
            namespaces.dedup();
            return Ok(namespaces);
        }
        Ok(vec![selector.to_string()])
    }

    /// Drop every cached mapping
    pub fn invalidate(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
    }

    /// Number of cached mappings, expired entries included
    pub fn cached_len(&self) -> usize {
        self.cache.read().map(|cache| cache.len()).unwrap_or_default()
    }

    fn cached(&self, gvk: &GroupVersionKind) -> Option<RestMapping> {
        let cache = self.cache.read().ok()?;
        let entry = cache.get(gvk)?;
        match self.ttl {
            Some(ttl) if entry.resolved_at.elapsed() >= ttl => None,
            _ => Some(entry.mapping.clone()),
        }
    }
}

/// Reject filters that must never reach discovery
pub fn check_filter(api_version: &str, kind: &str) -> Result<(), LocateError> {
    let reason = if kind.trim().is_empty() {
        Some("kind must not be empty")
    } else if kind.trim() == WILDCARD {
        Some("wildcard kind is not supported")
    } else if api_version.trim() == WILDCARD {
        Some("wildcard apiVersion is not supported")
    } else if api_version.trim().is_empty() {
        Some("apiVersion must not be empty")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(LocateError::Configuration {
            kind: kind.to_string(),
            api_version: api_version.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Split `group/version` (or a bare core `version`) into a GVK
pub fn parse_gvk(api_version: &str, kind: &str) -> GroupVersionKind {
    let api_version = api_version.trim();
    let (group, version) = api_version.split_once('/').unwrap_or(("", api_version));
    GroupVersionKind::gvk(group, version, kind.trim())
}
