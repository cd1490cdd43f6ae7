//! # Initialization
//!
//! Bootstrap: rustls provider, tracing, metrics, probe server, Kubernetes
//! client, initial catalog load and configuration watchers. Any failure here is
//! fatal and surfaces as an error from `main`.

use crate::catalog::{
    start_file_watch, start_kube_watch, ConfigCatalog, FileCatalogSource, KubeCatalogSource,
};
use crate::cli::{Cli, Command};
use crate::cluster::{ClusterProvider, KubeClusterProvider};
use crate::config::{ControllerConfig, LogFormat};
use crate::git::{Git2Backend, VersionControl};
use crate::observability;
use crate::server::{start_server, ServerState};
use crate::sync::{RunMode, SyncEngine, SyncScheduler};
use anyhow::{Context, Result};
use kube::Client;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Everything the run loop needs after bootstrap
pub struct InitializationResult {
    pub config: ControllerConfig,
    pub client: Client,
    pub catalog: Arc<ConfigCatalog>,
    pub server_state: Arc<ServerState>,
    /// Configuration watcher, absent in one-shot mode
    pub watch_handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("config", &self.config)
            .field("catalog_generation", &self.catalog.snapshot().generation())
            .field("watching", &self.watch_handle.is_some())
            .finish_non_exhaustive()
    }
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the default `kube_versioner=info`.
pub fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "kube_versioner=info".into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(e) = result {
        warn!("Tracing subscriber already initialized: {}", e);
    }
}

/// Bootstrap the process
pub async fn initialize(cli: &Cli) -> Result<InitializationResult> {
    // Must happen before any TLS connection is made; an already installed provider is fine
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = ControllerConfig::from_env();
    init_tracing(config.log_format);

    info!("Starting kube-versioner {}", env!("CARGO_PKG_VERSION"));
    info!(
        "Build info: datetime={}, git_hash={}",
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    if config.enable_metrics {
        let state = Arc::clone(&server_state);
        let port = config.metrics_port;
        tokio::spawn(async move {
            if let Err(e) = start_server(port, state).await {
                error!("HTTP server error: {}", e);
            }
        });
    }

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let watch = !cli.one_shot;
    let (catalog, watch_handle) = match &cli.command {
        Command::KubeController => {
            let source = KubeCatalogSource::new(client.clone());
            let catalog = Arc::new(
                ConfigCatalog::load(&source)
                    .await
                    .context("Failed to load configuration from cluster resources")?,
            );
            let handle = watch.then(|| start_kube_watch(Arc::clone(&catalog), source));
            (catalog, handle)
        }
        Command::File { path } => {
            let source = FileCatalogSource::new(path);
            let catalog = Arc::new(
                ConfigCatalog::load(&source)
                    .await
                    .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            );
            let handle = if watch {
                Some(
                    start_file_watch(Arc::clone(&catalog), source, config.config_reload_debounce())
                        .context("Failed to watch configuration file")?,
                )
            } else {
                None
            };
            (catalog, handle)
        }
    };

    let snapshot = catalog.snapshot();
    info!(
        tenants = snapshot.tenant_count(),
        git_targets = snapshot.git_target_count(),
        "Configuration loaded"
    );

    Ok(InitializationResult {
        config,
        client,
        catalog,
        server_state,
        watch_handle,
    })
}

/// Bootstrap, then run the scheduler until it finishes or a shutdown signal arrives
pub async fn run(cli: Cli) -> Result<()> {
    let init = initialize(&cli).await?;

    let provider: Arc<dyn ClusterProvider> = Arc::new(KubeClusterProvider::new(
        init.client.clone(),
        init.config.list_page_size,
    ));
    let backend: Arc<dyn VersionControl> = Arc::new(Git2Backend::new(
        init.config.commit_author_name.clone(),
        init.config.commit_author_email.clone(),
    ));
    let engine = Arc::new(SyncEngine::new(
        provider,
        backend,
        init.config.discovery_cache_ttl(),
    ));

    let mode = if cli.one_shot {
        RunMode::OneShot
    } else {
        RunMode::Continuous {
            interval: init.config.sync_interval(),
        }
    };
    let scheduler = SyncScheduler::new(Arc::clone(&init.catalog), engine, mode);

    init.server_state.mark_ready();
    let summary = scheduler.run(shutdown_signal()).await;

    if let Some(handle) = init.watch_handle {
        handle.abort();
    }
    info!(
        passes = summary.passes,
        unclean_passes = summary.unclean_passes,
        "kube-versioner stopped"
    );

    if mode == RunMode::OneShot && summary.unclean_passes > 0 {
        anyhow::bail!("synchronization pass finished with errors");
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C"),
        () = terminate => info!("Received SIGTERM"),
    }
}
