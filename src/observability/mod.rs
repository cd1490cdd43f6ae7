//! # Observability
//!
//! Prometheus metrics for synchronization passes, git operations and
//! configuration reloads. Structured logging is set up in `runtime`.

pub mod metrics;
