//! # Catalog Snapshot
//!
//! Immutable, validated view of all tenants and git targets. A pass works on
//! one snapshot from start to finish; reloads build a new one.

use crate::catalog::source::CatalogDocument;
use crate::catalog::validation::{include_filter_warnings, validate_export, validate_git};
use crate::crd::{ExportConfigSpec, GitConfigSpec};
use crate::error::ConfigurationError;
use chrono::{DateTime, Utc};
use kube::api::ObjectMeta;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::warn;

/// Namespace assumed for file manifests that do not set one
const DEFAULT_NAMESPACE: &str = "default";

/// `(namespace, name)` identity of a configuration object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    fn from_meta(meta: &ObjectMeta) -> Self {
        Self::new(
            meta.namespace
                .clone()
                .filter(|ns| !ns.is_empty())
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            meta.name.clone().unwrap_or_default(),
        )
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// One validated ExportConfig
#[derive(Debug, Clone)]
pub struct TenantConfig {
    pub key: ObjectKey,
    pub spec: ExportConfigSpec,
}

impl TenantConfig {
    pub fn name(&self) -> &str {
        &self.key.name
    }

    /// Key of the GitConfig this tenant writes to
    pub fn git_key(&self) -> ObjectKey {
        ObjectKey::new(self.key.namespace.clone(), self.spec.git_ref.clone())
    }
}

/// One validated GitConfig
#[derive(Debug, Clone)]
pub struct GitTarget {
    pub key: ObjectKey,
    pub spec: GitConfigSpec,
}

impl GitTarget {
    pub fn name(&self) -> &str {
        &self.key.name
    }
}

/// A tenant joined with its git target
#[derive(Debug, Clone)]
pub struct SyncTarget {
    pub tenant: Arc<TenantConfig>,
    pub git: Arc<GitTarget>,
}

/// Immutable catalog contents
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    generation: u64,
    loaded_at: DateTime<Utc>,
    tenants: BTreeMap<ObjectKey, Arc<TenantConfig>>,
    git_targets: HashMap<ObjectKey, Arc<GitTarget>>,
}

impl CatalogSnapshot {
    /// Catalog with no tenants; what a process holds before its first load
    pub fn empty() -> Self {
        Self {
            generation: 0,
            loaded_at: Utc::now(),
            tenants: BTreeMap::new(),
            git_targets: HashMap::new(),
        }
    }

    /// Validate `document` and build a snapshot from it
    ///
    /// Every problem is collected; any problem rejects the whole document.
    pub fn build(document: CatalogDocument, generation: u64) -> Result<Self, ConfigurationError> {
        let mut errors = Vec::new();

        let mut git_targets = HashMap::new();
        for git in document.gits {
            let key = ObjectKey::from_meta(&git.metadata);
            errors.extend(validate_git(&key.name, &git.spec));
            if git_targets.contains_key(&key) {
                errors.push(ConfigurationError::Duplicate {
                    kind: "GitConfig",
                    name: key.to_string(),
                });
                continue;
            }
            git_targets.insert(
                key.clone(),
                Arc::new(GitTarget {
                    key,
                    spec: git.spec,
                }),
            );
        }

        let mut tenants = BTreeMap::new();
        for export in document.exports {
            let key = ObjectKey::from_meta(&export.metadata);
            errors.extend(validate_export(&key.name, &export.spec));
            for warning in include_filter_warnings(&export.spec) {
                warn!(tenant = %key, "{warning}; the filter will be skipped");
            }

            let tenant = TenantConfig {
                key: key.clone(),
                spec: export.spec,
            };
            let git_key = tenant.git_key();
            if !tenant.spec.git_ref.trim().is_empty() && !git_targets.contains_key(&git_key) {
                errors.push(ConfigurationError::MissingGitTarget {
                    tenant: key.name.clone(),
                    git_ref: git_key.name,
                    namespace: git_key.namespace,
                });
            }
            if tenants.contains_key(&key) {
                errors.push(ConfigurationError::Duplicate {
                    kind: "ExportConfig",
                    name: key.to_string(),
                });
                continue;
            }
            tenants.insert(key, Arc::new(tenant));
        }

        if let Some(error) = ConfigurationError::from_many(errors) {
            return Err(error);
        }
        Ok(Self {
            generation,
            loaded_at: Utc::now(),
            tenants,
            git_targets,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn tenant_count(&self) -> usize {
        self.tenants.len()
    }

    pub fn git_target_count(&self) -> usize {
        self.git_targets.len()
    }

    pub fn tenants(&self) -> impl Iterator<Item = &Arc<TenantConfig>> {
        self.tenants.values()
    }

    /// Git target referenced by `tenant`
    pub fn lookup_git(&self, tenant: &TenantConfig) -> Result<Arc<GitTarget>, ConfigurationError> {
        let key = tenant.git_key();
        self.git_targets
            .get(&key)
            .map(Arc::clone)
            .ok_or_else(|| ConfigurationError::MissingGitTarget {
                tenant: tenant.name().to_string(),
                git_ref: key.name,
                namespace: key.namespace,
            })
    }

    /// Tenants joined with their git targets, ordered by (namespace, name)
    ///
    /// A tenant whose target cannot be found is logged and left out.
    pub fn targets(&self) -> Vec<SyncTarget> {
        self.tenants
            .values()
            .filter_map(|tenant| match self.lookup_git(tenant) {
                Ok(git) => Some(SyncTarget {
                    tenant: Arc::clone(tenant),
                    git,
                }),
                Err(e) => {
                    warn!(tenant = %tenant.key, error = %e, "Skipping tenant without git target");
                    None
                }
            })
            .collect()
    }
}
