//! # Constants
//!
//! Shared constants used throughout the exporter.
//!
//! These values represent reasonable defaults and can be overridden via
//! environment variables where applicable (see [`crate::config::ControllerConfig`]).

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default interval between synchronization passes in continuous mode (seconds)
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;

/// Default lifetime of a cached discovery mapping (seconds)
/// Zero keeps mappings for the lifetime of the process
pub const DEFAULT_DISCOVERY_CACHE_TTL_SECS: u64 = 3600;

/// Default number of objects requested per list page
pub const DEFAULT_LIST_PAGE_SIZE: u32 = 500;

/// Default debounce window for configuration file changes (milliseconds)
pub const DEFAULT_CONFIG_RELOAD_DEBOUNCE_MS: u64 = 500;

/// Author used for synchronization commits when git has no identity configured
pub const DEFAULT_COMMIT_AUTHOR_NAME: &str = "kube-versioner";

/// Email used for synchronization commits when git has no identity configured
pub const DEFAULT_COMMIT_AUTHOR_EMAIL: &str = "kube-versioner@localhost";

/// Directory used in place of a namespace for cluster-scoped resources.
///
/// Part of the on-disk path contract: changing it moves every cluster-scoped
/// manifest. The leading underscore keeps it out of the DNS-label namespace space.
pub const CLUSTER_SCOPED_PLACEHOLDER: &str = "_cluster";

/// Namespace selectors that expand to every namespace in the cluster
pub const ALL_NAMESPACES_SELECTORS: [&str; 2] = ["*", "all"];

/// Wildcard that is never accepted as a resource kind or apiVersion
pub const WILDCARD: &str = "*";

/// Name of the remote created by clone and used for push
pub const DEFAULT_REMOTE_NAME: &str = "origin";

/// Upper bound on credential callback invocations before a git transport gives up
pub const MAX_CREDENTIAL_ATTEMPTS: usize = 3;
