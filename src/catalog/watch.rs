//! # Configuration Watch
//!
//! Hot-reloads the catalog when its source changes. Every trigger performs a
//! full reload through [`ConfigCatalog::reload`], so a bad edit is rejected as a
//! whole and the previous snapshot stays in effect.

use crate::catalog::{CatalogSource, ConfigCatalog, FileCatalogSource, KubeCatalogSource};
use crate::crd::{ExportConfig, GitConfig};
use futures::{stream, StreamExt};
use kube::Api;
use kube_runtime::watcher;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Reload `catalog` from `source` and log the outcome
pub async fn reload_and_log(catalog: &ConfigCatalog, source: &dyn CatalogSource) {
    match catalog.reload(source).await {
        Ok(generation) => {
            let snapshot = catalog.snapshot();
            info!(
                generation = generation,
                tenants = snapshot.tenant_count(),
                git_targets = snapshot.git_target_count(),
                source = %source.describe(),
                "Configuration reloaded"
            );
        }
        Err(e) => error!(
            error = %e,
            source = %source.describe(),
            "Configuration reload rejected, keeping previous configuration"
        ),
    }
}

/// Watch ExportConfig and GitConfig resources and reload on every change
pub fn start_kube_watch(catalog: Arc<ConfigCatalog>, source: KubeCatalogSource) -> JoinHandle<()> {
    tokio::spawn(async move {
        let exports: Api<ExportConfig> = Api::all(source.client().clone());
        let gits: Api<GitConfig> = Api::all(source.client().clone());

        let export_events = watcher(exports, watcher::Config::default())
            .map(|event| event.map(|e| is_change(&e)))
            .boxed();
        let git_events = watcher(gits, watcher::Config::default())
            .map(|event| event.map(|e| is_change(&e)))
            .boxed();
        let mut events = stream::select(export_events, git_events);

        info!("Configuration watcher started for ExportConfig and GitConfig resources");

        while let Some(event) = events.next().await {
            match event {
                Ok(true) => reload_and_log(&catalog, &source).await,
                Ok(false) => {}
                Err(e) => {
                    // The watcher retries on its own
                    error!(error = %e, "Error watching configuration resources");
                }
            }
        }

        warn!("Configuration watch stream ended");
    })
}

/// Live changes, plus the end of every (re)list
///
/// A relist after a desync replays the whole collection; reloading once it is
/// complete picks up edits made while the watch was disconnected.
fn is_change<K>(event: &watcher::Event<K>) -> bool {
    matches!(
        event,
        watcher::Event::Apply(_) | watcher::Event::Delete(_) | watcher::Event::InitDone
    )
}

/// Watch the configuration file and reload after each debounced change
///
/// The parent directory is watched so that editors replacing the file via
/// rename are noticed too.
pub fn start_file_watch(
    catalog: Arc<ConfigCatalog>,
    source: FileCatalogSource,
    debounce: Duration,
) -> Result<JoinHandle<()>, notify::Error> {
    let path = source.path().to_path_buf();
    let file_name = path.file_name().map(ToOwned::to_owned);
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<DebounceEventResult>();
    let mut debouncer = new_debouncer(debounce, move |result: DebounceEventResult| {
        // Receiver gone means the watch task ended; nothing left to notify
        let _ = tx.send(result);
    })?;
    debouncer
        .watcher()
        .watch(&directory, RecursiveMode::NonRecursive)?;

    info!(path = %path.display(), "Configuration file watcher started");

    Ok(tokio::spawn(async move {
        let _debouncer = debouncer;
        while let Some(result) = rx.recv().await {
            match result {
                Ok(events) => {
                    let touched = events
                        .iter()
                        .any(|event| event.path.file_name() == file_name.as_deref());
                    if touched {
                        info!(path = %path.display(), "Configuration file changed, reloading");
                        reload_and_log(&catalog, &source).await;
                    }
                }
                Err(e) => error!(error = %e, "Error watching configuration file"),
            }
        }
        warn!("Configuration file watch ended");
    }))
}
