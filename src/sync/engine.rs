//! # Sync Engine
//!
//! One synchronization pass over a catalog snapshot.
//!
//! Tenants are grouped by git target. Each target gets one working copy, one
//! commit and at most one push per pass, covering every tenant that references
//! it. Targets run sequentially; a failing target never affects the others.

use crate::catalog::{CatalogSnapshot, GitTarget, ObjectKey, TenantConfig};
use crate::cluster::ClusterProvider;
use crate::error::{LocateError, SyncError};
use crate::export::{render, ResourceFetcher, ResourceLocator};
use crate::git::{CommitOutcome, PushStatus, RepositoryManager, VersionControl};
use crate::observability::metrics;
use chrono::{SecondsFormat, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, info_span, warn, Instrument};

/// Per-target export counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportStats {
    /// Manifests written into the working copy
    pub written: usize,
    /// Records left out by label/annotation selectors or exclusions
    pub filtered_out: usize,
    /// Include filters rejected as invalid or unknown to discovery
    pub filters_skipped: usize,
    /// (mapping, namespace) combinations whose list call failed
    pub lists_failed: usize,
    /// Records that could not be serialized or written
    pub records_failed: usize,
}

impl ExportStats {
    pub fn errors(&self) -> usize {
        self.filters_skipped + self.lists_failed + self.records_failed
    }
}

/// What a target's persistence stage did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOutcome {
    pub commit: CommitOutcome,
    pub push: PushStatus,
}

/// Result of one git target in one pass
#[derive(Debug)]
pub struct TargetReport {
    pub git: ObjectKey,
    pub tenants: Vec<ObjectKey>,
    pub stats: ExportStats,
    pub outcome: Result<TargetOutcome, SyncError>,
}

impl TargetReport {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Short outcome label used in logs and metrics
    pub fn label(&self) -> &'static str {
        match &self.outcome {
            Err(_) => "failed",
            Ok(TargetOutcome {
                push: PushStatus::SkippedDryRun,
                ..
            }) => "dry_run",
            Ok(TargetOutcome {
                push: PushStatus::Pushed,
                ..
            }) => "pushed",
            Ok(TargetOutcome {
                push: PushStatus::AlreadyUpToDate,
                ..
            }) => "up_to_date",
        }
    }
}

/// Result of one pass
#[derive(Debug)]
pub struct PassReport {
    pub generation: u64,
    pub targets: Vec<TargetReport>,
    pub duration: Duration,
}

impl PassReport {
    /// No target failed and no filter, list or record was skipped because of an error
    pub fn is_clean(&self) -> bool {
        self.targets
            .iter()
            .all(|target| target.succeeded() && target.stats.errors() == 0)
    }

    pub fn failed_targets(&self) -> usize {
        self.targets.iter().filter(|target| !target.succeeded()).count()
    }

    pub fn resources_written(&self) -> usize {
        self.targets.iter().map(|target| target.stats.written).sum()
    }

    pub fn target(&self, git: &ObjectKey) -> Option<&TargetReport> {
        self.targets.iter().find(|target| &target.git == git)
    }
}

/// Runs passes against catalog snapshots
#[derive(Debug)]
pub struct SyncEngine {
    locator: ResourceLocator,
    fetcher: ResourceFetcher,
    backend: Arc<dyn VersionControl>,
}

impl SyncEngine {
    pub fn new(
        provider: Arc<dyn ClusterProvider>,
        backend: Arc<dyn VersionControl>,
        discovery_ttl: Option<Duration>,
    ) -> Self {
        Self {
            locator: ResourceLocator::new(Arc::clone(&provider), discovery_ttl),
            fetcher: ResourceFetcher::new(provider),
            backend,
        }
    }

    pub fn locator(&self) -> &ResourceLocator {
        &self.locator
    }

    /// Synchronize every target in `snapshot`
    pub async fn run_pass(&self, snapshot: &CatalogSnapshot) -> PassReport {
        let generation = snapshot.generation();
        let span = info_span!("sync.pass", generation = generation);
        async move {
            let started = Instant::now();
            let groups = group_by_git(snapshot);
            info!(targets = groups.len(), tenants = snapshot.tenant_count(), "Starting synchronization pass");

            let mut targets = Vec::with_capacity(groups.len());
            for (git, tenants) in groups {
                let span = info_span!("sync.target", git = %git.key, branch = %git.spec.branch);
                targets.push(self.sync_git_target(&git, &tenants).instrument(span).await);
            }

            let report = PassReport {
                generation,
                targets,
                duration: started.elapsed(),
            };
            metrics::record_sync_pass(report.duration.as_secs_f64(), report.is_clean());
            if report.is_clean() {
                info!(
                    targets = report.targets.len(),
                    resources = report.resources_written(),
                    duration_ms = report.duration.as_millis() as u64,
                    "Synchronization pass completed"
                );
            } else {
                warn!(
                    targets = report.targets.len(),
                    failed_targets = report.failed_targets(),
                    resources = report.resources_written(),
                    duration_ms = report.duration.as_millis() as u64,
                    "Synchronization pass completed with errors"
                );
            }
            report
        }
        .instrument(span)
        .await
    }

    /// Export all `tenants` into `git`, then commit and push
    pub async fn sync_git_target(&self, git: &GitTarget, tenants: &[Arc<TenantConfig>]) -> TargetReport {
        let mut stats = ExportStats::default();
        let outcome = self.persist(git, tenants, &mut stats).await;

        match &outcome {
            Ok(result) => info!(
                written = stats.written,
                filtered_out = stats.filtered_out,
                errors = stats.errors(),
                commit = ?result.commit,
                push = ?result.push,
                "Git target synchronized"
            ),
            Err(e) => error!(
                written = stats.written,
                error = %e,
                cause = ?std::error::Error::source(e).map(ToString::to_string),
                "Git target failed"
            ),
        }

        let report = TargetReport {
            git: git.key.clone(),
            tenants: tenants.iter().map(|tenant| tenant.key.clone()).collect(),
            stats,
            outcome,
        };
        metrics::record_target_outcome(report.label());
        metrics::increment_resources_exported(report.stats.written as u64);
        report
    }

    async fn persist(
        &self,
        git: &GitTarget,
        tenants: &[Arc<TenantConfig>],
        stats: &mut ExportStats,
    ) -> Result<TargetOutcome, SyncError> {
        let mut repo = RepositoryManager::new(Arc::clone(&self.backend), git.name(), &git.spec)
            .map_err(SyncError::Configuration)?;
        let path = repo.local_path().to_path_buf();
        repo.materialize()
            .await
            .map_err(|source| SyncError::Materialize { path, source })?;

        for tenant in tenants {
            self.export_tenant(tenant, &repo, stats).await;
        }

        let message = format!(
            "Resource synchronization on {}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        );
        let commit = repo.commit(&message).await.map_err(SyncError::Commit)?;
        let push = repo.push().await.map_err(|source| SyncError::Push {
            branch: git.spec.branch.clone(),
            source,
        })?;
        Ok(TargetOutcome { commit, push })
    }

    async fn export_tenant(&self, tenant: &TenantConfig, repo: &RepositoryManager, stats: &mut ExportStats) {
        let namespaces = match self.locator.resolve_namespaces(&tenant.spec.namespace).await {
            Ok(namespaces) => namespaces,
            Err(e) => {
                error!(tenant = %tenant.key, error = %e, "Failed to resolve namespaces, skipping tenant");
                stats.lists_failed += 1;
                metrics::increment_resource_errors("list");
                return;
            }
        };
        let cluster_wide = [String::new()];
        let written_before = stats.written;

        for filter in &tenant.spec.include_resource {
            let mapping = match self.locator.resolve(&filter.api_version, filter.kind()).await {
                Ok(mapping) => mapping,
                Err(e @ LocateError::Configuration { .. }) => {
                    warn!(tenant = %tenant.key, error = %e, "Skipping invalid resource filter");
                    stats.filters_skipped += 1;
                    metrics::increment_resource_errors("filter");
                    continue;
                }
                Err(e) => {
                    error!(tenant = %tenant.key, error = %e, "Resource discovery failed, skipping filter");
                    stats.filters_skipped += 1;
                    metrics::increment_resource_errors("discovery");
                    continue;
                }
            };
            let scopes: &[String] = if mapping.namespaced {
                &namespaces
            } else {
                &cluster_wide
            };

            for namespace in scopes {
                let records = match self.fetcher.list(&mapping, namespace).await {
                    Ok(records) => records,
                    Err(e) => {
                        error!(tenant = %tenant.key, error = %e, "List failed, skipping namespace");
                        stats.lists_failed += 1;
                        metrics::increment_resource_errors("list");
                        continue;
                    }
                };
                for record in records {
                    let resource = match render(record, filter, &tenant.spec) {
                        Ok(Some(resource)) => resource,
                        Ok(None) => {
                            stats.filtered_out += 1;
                            continue;
                        }
                        Err(e) => {
                            error!(
                                tenant = %tenant.key,
                                kind = %mapping.kind(),
                                namespace = %namespace,
                                error = %e,
                                "Failed to serialize resource, skipping"
                            );
                            stats.records_failed += 1;
                            metrics::increment_resource_errors("serialize");
                            continue;
                        }
                    };
                    if let Err(e) = repo.write_resource(&resource.path, &resource.contents).await {
                        error!(tenant = %tenant.key, path = %resource.path, error = %e, "Failed to write resource");
                        stats.records_failed += 1;
                        metrics::increment_resource_errors("write");
                    } else {
                        stats.written += 1;
                    }
                }
            }
        }

        info!(
            tenant = %tenant.key,
            written = stats.written - written_before,
            "Tenant exported"
        );
    }
}

/// Tenants grouped by git target, in snapshot order
fn group_by_git(snapshot: &CatalogSnapshot) -> Vec<(Arc<GitTarget>, Vec<Arc<TenantConfig>>)> {
    let mut groups: Vec<(Arc<GitTarget>, Vec<Arc<TenantConfig>>)> = Vec::new();
    let mut index: HashMap<ObjectKey, usize> = HashMap::new();
    for target in snapshot.targets() {
        match index.get(&target.git.key) {
            Some(&position) => groups[position].1.push(target.tenant),
            None => {
                index.insert(target.git.key.clone(), groups.len());
                groups.push((target.git, vec![target.tenant]));
            }
        }
    }
    groups
}
