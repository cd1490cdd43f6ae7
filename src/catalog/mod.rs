//! # Configuration Catalog
//!
//! Holds the current validated set of tenants and git targets.
//!
//! Readers take an `Arc<CatalogSnapshot>` and keep it for the duration of a
//! pass. Reloads build a complete new snapshot off to the side and swap it in
//! atomically; a reload that fails validation leaves the previous snapshot in
//! place.
//!
//! ## Module Structure
//!
//! - `snapshot.rs` - immutable catalog contents and the tenant/git join
//! - `source.rs` - cluster, file and static document sources
//! - `validation.rs` - load-time checks
//! - `watch.rs` - hot reload from cluster watches or file events

mod snapshot;
mod source;
mod validation;
mod watch;

pub use snapshot::{CatalogSnapshot, GitTarget, ObjectKey, SyncTarget, TenantConfig};
pub use source::{
    CatalogDocument, CatalogSource, FileCatalogSource, KubeCatalogSource, StaticCatalogSource,
};
pub use validation::{validate_export, validate_git, validate_repository_url};
pub use watch::{reload_and_log, start_file_watch, start_kube_watch};

use crate::error::ConfigurationError;
use crate::observability::metrics;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Shared, atomically replaceable catalog
#[derive(Debug)]
pub struct ConfigCatalog {
    current: RwLock<Arc<CatalogSnapshot>>,
    generations: AtomicU64,
}

impl Default for ConfigCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigCatalog {
    /// Catalog holding an empty generation-0 snapshot
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(CatalogSnapshot::empty())),
            generations: AtomicU64::new(0),
        }
    }

    /// Initial load; an invalid configuration is returned as an error
    pub async fn load(source: &dyn CatalogSource) -> Result<Self, ConfigurationError> {
        let catalog = Self::new();
        catalog.reload(source).await?;
        Ok(catalog)
    }

    /// The snapshot currently in effect
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&current)
    }

    /// Load `source` and swap in the result, returning its generation
    pub async fn reload(&self, source: &dyn CatalogSource) -> Result<u64, ConfigurationError> {
        match source.load().await {
            Ok(document) => self.apply(document),
            Err(e) => {
                metrics::increment_config_reloads("rejected");
                Err(e)
            }
        }
    }

    /// Validate `document` and swap it in, returning its generation
    ///
    /// A slower reload never replaces a snapshot from a later one.
    pub fn apply(&self, document: CatalogDocument) -> Result<u64, ConfigurationError> {
        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = match CatalogSnapshot::build(document, generation) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                metrics::increment_config_reloads("rejected");
                return Err(e);
            }
        };

        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if current.generation() < generation {
            metrics::set_catalog_tenants(snapshot.tenant_count());
            metrics::set_catalog_generation(generation);
            *current = Arc::new(snapshot);
        }
        metrics::increment_config_reloads("applied");
        Ok(generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{ExportConfig, ExportConfigSpec, OutputType};

    fn orphan_tenant() -> CatalogDocument {
        let mut export = ExportConfig::new(
            "orphan",
            ExportConfigSpec {
                namespace: "all".into(),
                include_resource: Vec::new(),
                exclude_resource: Vec::new(),
                labels: Default::default(),
                annotations: Default::default(),
                output_type: OutputType::Yaml,
                git_ref: "missing".into(),
                folder_structure: String::new(),
            },
        );
        export.metadata.namespace = Some("versioner".into());
        CatalogDocument {
            exports: vec![export],
            gits: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_load_empty_document() {
        let catalog = ConfigCatalog::load(&StaticCatalogSource::default()).await.unwrap();
        let snapshot = catalog.snapshot();
        assert_eq!(snapshot.generation(), 1);
        assert_eq!(snapshot.tenant_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_reload_keeps_previous_snapshot() {
        let catalog = ConfigCatalog::load(&StaticCatalogSource::default()).await.unwrap();
        let before = catalog.snapshot();

        let source = StaticCatalogSource::new(orphan_tenant());
        assert!(catalog.reload(&source).await.is_err());
        assert!(Arc::ptr_eq(&before, &catalog.snapshot()));
    }

    #[test]
    fn test_held_snapshot_survives_swap() {
        let catalog = ConfigCatalog::new();
        let held = catalog.snapshot();
        let generation = catalog.apply(CatalogDocument::default()).unwrap();
        assert_eq!(held.generation(), 0);
        assert_eq!(catalog.snapshot().generation(), generation);
    }

    #[tokio::test]
    async fn test_initial_load_failure_is_error() {
        let source = StaticCatalogSource::new(orphan_tenant());
        assert!(ConfigCatalog::load(&source).await.is_err());
    }
}
