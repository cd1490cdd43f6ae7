//! # Sync Scheduler
//!
//! Drives passes in one of two modes fixed at startup:
//!
//! - **one-shot**: a single pass, then return
//! - **continuous**: a pass at every interval tick, the first one a full
//!   interval after start
//!
//! Passes never overlap: the next tick is only awaited once the current pass
//! has finished, and ticks missed meanwhile are delayed rather than bunched.
//! Shutdown is observed between passes only.

use crate::catalog::ConfigCatalog;
use crate::sync::{PassReport, SyncEngine};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

/// Execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    OneShot,
    Continuous { interval: Duration },
}

/// Passes run by [`SyncScheduler::run`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub passes: usize,
    /// Passes in which any target, filter, list or record failed
    pub unclean_passes: usize,
}

impl RunSummary {
    fn record(&mut self, report: &PassReport) {
        self.passes += 1;
        if !report.is_clean() {
            self.unclean_passes += 1;
        }
    }
}

/// Runs the engine against the current catalog snapshot on schedule
#[derive(Debug)]
pub struct SyncScheduler {
    catalog: Arc<ConfigCatalog>,
    engine: Arc<SyncEngine>,
    mode: RunMode,
}

impl SyncScheduler {
    pub fn new(catalog: Arc<ConfigCatalog>, engine: Arc<SyncEngine>, mode: RunMode) -> Self {
        Self {
            catalog,
            engine,
            mode,
        }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// One pass against the snapshot current at call time
    ///
    /// A reload while the pass runs takes effect from the next pass.
    pub async fn run_pass(&self) -> PassReport {
        let snapshot = self.catalog.snapshot();
        self.engine.run_pass(&snapshot).await
    }

    /// Run until the mode is exhausted or `shutdown` resolves
    pub async fn run<F>(&self, shutdown: F) -> RunSummary
    where
        F: Future<Output = ()>,
    {
        let mut summary = RunSummary::default();
        match self.mode {
            RunMode::OneShot => {
                info!("Running a single synchronization pass");
                let report = self.run_pass().await;
                summary.record(&report);
            }
            RunMode::Continuous { interval } => {
                info!(interval_secs = interval.as_secs(), "Starting periodic synchronization");
                let mut ticker = interval_at(Instant::now() + interval, interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                tokio::pin!(shutdown);

                loop {
                    tokio::select! {
                        biased;
                        () = &mut shutdown => {
                            info!(passes = summary.passes, "Shutdown requested, stopping scheduler");
                            break;
                        }
                        _ = ticker.tick() => {
                            let report = self.run_pass().await;
                            if !report.is_clean() {
                                error!(
                                    generation = report.generation,
                                    failed_targets = report.failed_targets(),
                                    "Pass finished with errors, continuing with next interval"
                                );
                            }
                            summary.record(&report);
                        }
                    }
                }
            }
        }
        summary
    }
}
