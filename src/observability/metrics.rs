//! # Metrics
//!
//! Prometheus metrics for monitoring synchronization.
//!
//! ## Metrics Exposed
//!
//! - `kube_versioner_sync_passes_total` - Total number of synchronization passes
//! - `kube_versioner_sync_pass_failures_total` - Passes in which at least one target or record failed
//! - `kube_versioner_sync_pass_duration_seconds` - Duration of synchronization passes
//! - `kube_versioner_targets_total` - Git target outcomes per pass, by outcome
//! - `kube_versioner_resources_exported_total` - Manifests written into working copies
//! - `kube_versioner_resource_errors_total` - Per-record and per-filter failures, by stage
//! - `kube_versioner_git_operations_total` - Git operations, by operation
//! - `kube_versioner_git_operation_errors_total` - Failed git operations, by operation
//! - `kube_versioner_git_operation_duration_seconds` - Duration of git operations, by operation
//! - `kube_versioner_discovery_lookups_total` - Discovery cache lookups, by result (`hit`/`miss`)
//! - `kube_versioner_config_reloads_total` - Configuration reloads, by outcome (`applied`/`rejected`)
//! - `kube_versioner_catalog_tenants` - Tenants in the active catalog
//! - `kube_versioner_catalog_generation` - Generation of the active catalog

use anyhow::Result;
use prometheus::{Histogram, HistogramVec, IntCounter, IntCounterVec, IntGauge, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static SYNC_PASSES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "kube_versioner_sync_passes_total",
        "Total number of synchronization passes",
    )
    .expect("Failed to create SYNC_PASSES_TOTAL metric - this should never happen")
});

static SYNC_PASS_FAILURES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "kube_versioner_sync_pass_failures_total",
        "Total number of synchronization passes with at least one failure",
    )
    .expect("Failed to create SYNC_PASS_FAILURES_TOTAL metric - this should never happen")
});

static SYNC_PASS_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "kube_versioner_sync_pass_duration_seconds",
            "Duration of synchronization passes in seconds",
        )
        .buckets(vec![0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0]),
    )
    .expect("Failed to create SYNC_PASS_DURATION metric - this should never happen")
});

static TARGETS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "kube_versioner_targets_total",
            "Git target outcomes per synchronization pass",
        ),
        &["outcome"],
    )
    .expect("Failed to create TARGETS_TOTAL metric - this should never happen")
});

static RESOURCES_EXPORTED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "kube_versioner_resources_exported_total",
        "Total number of manifests written into working copies",
    )
    .expect("Failed to create RESOURCES_EXPORTED_TOTAL metric - this should never happen")
});

static RESOURCE_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "kube_versioner_resource_errors_total",
            "Total number of per-filter and per-record failures by stage",
        ),
        &["stage"],
    )
    .expect("Failed to create RESOURCE_ERRORS_TOTAL metric - this should never happen")
});

static GIT_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "kube_versioner_git_operations_total",
            "Total number of git operations by operation",
        ),
        &["operation"],
    )
    .expect("Failed to create GIT_OPERATIONS_TOTAL metric - this should never happen")
});

static GIT_OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "kube_versioner_git_operation_errors_total",
            "Total number of failed git operations by operation",
        ),
        &["operation"],
    )
    .expect("Failed to create GIT_OPERATION_ERRORS_TOTAL metric - this should never happen")
});

static GIT_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "kube_versioner_git_operation_duration_seconds",
            "Duration of git operations in seconds by operation",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["operation"],
    )
    .expect("Failed to create GIT_OPERATION_DURATION metric - this should never happen")
});

static DISCOVERY_LOOKUPS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "kube_versioner_discovery_lookups_total",
            "Total number of discovery cache lookups by result",
        ),
        &["result"],
    )
    .expect("Failed to create DISCOVERY_LOOKUPS_TOTAL metric - this should never happen")
});

static CONFIG_RELOADS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "kube_versioner_config_reloads_total",
            "Total number of configuration reloads by outcome",
        ),
        &["outcome"],
    )
    .expect("Failed to create CONFIG_RELOADS_TOTAL metric - this should never happen")
});

static CATALOG_TENANTS: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "kube_versioner_catalog_tenants",
        "Number of tenants in the active catalog",
    )
    .expect("Failed to create CATALOG_TENANTS metric - this should never happen")
});

static CATALOG_GENERATION: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "kube_versioner_catalog_generation",
        "Generation of the active catalog",
    )
    .expect("Failed to create CATALOG_GENERATION metric - this should never happen")
});

pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(SYNC_PASSES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SYNC_PASS_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SYNC_PASS_DURATION.clone()))?;
    REGISTRY.register(Box::new(TARGETS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RESOURCES_EXPORTED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RESOURCE_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(GIT_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(GIT_OPERATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(GIT_OPERATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(DISCOVERY_LOOKUPS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CONFIG_RELOADS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CATALOG_TENANTS.clone()))?;
    REGISTRY.register(Box::new(CATALOG_GENERATION.clone()))?;

    Ok(())
}

/// Record a finished pass
pub fn record_sync_pass(duration_secs: f64, clean: bool) {
    SYNC_PASSES_TOTAL.inc();
    SYNC_PASS_DURATION.observe(duration_secs);
    if !clean {
        SYNC_PASS_FAILURES_TOTAL.inc();
    }
}

pub fn record_target_outcome(outcome: &str) {
    TARGETS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn increment_resources_exported(count: u64) {
    RESOURCES_EXPORTED_TOTAL.inc_by(count);
}

pub fn increment_resource_errors(stage: &str) {
    RESOURCE_ERRORS_TOTAL.with_label_values(&[stage]).inc();
}

/// Record a git operation; failures also count towards the error total
pub fn record_git_operation(operation: &str, duration_secs: f64, success: bool) {
    GIT_OPERATIONS_TOTAL.with_label_values(&[operation]).inc();
    GIT_OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(duration_secs);
    if !success {
        GIT_OPERATION_ERRORS_TOTAL.with_label_values(&[operation]).inc();
    }
}

pub fn increment_discovery_lookups(result: &str) {
    DISCOVERY_LOOKUPS_TOTAL.with_label_values(&[result]).inc();
}

pub fn increment_config_reloads(outcome: &str) {
    CONFIG_RELOADS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn set_catalog_tenants(count: usize) {
    CATALOG_TENANTS.set(i64::try_from(count).unwrap_or(i64::MAX));
}

pub fn set_catalog_generation(generation: u64) {
    CATALOG_GENERATION.set(i64::try_from(generation).unwrap_or(i64::MAX));
}
