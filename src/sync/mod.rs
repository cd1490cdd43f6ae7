//! # Synchronization
//!
//! - `engine.rs` - one pass: export, write, commit and push per git target
//! - `scheduler.rs` - one-shot or periodic execution of passes

mod engine;
mod scheduler;

pub use engine::{ExportStats, PassReport, SyncEngine, TargetOutcome, TargetReport};
pub use scheduler::{RunMode, RunSummary, SyncScheduler};
