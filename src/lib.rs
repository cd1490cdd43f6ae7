//! # kube-versioner
//!
//! Mirrors a configurable subset of live Kubernetes resources into git
//! repositories.
//!
//! A pass takes the current [`catalog::CatalogSnapshot`], groups tenants by git
//! target and, per target: materializes the working copy, exports every
//! matching resource as a manifest, commits, and pushes unless the target is a
//! dry run. [`sync::SyncScheduler`] runs passes once or on an interval.

pub mod catalog;
pub mod cli;
pub mod cluster;
pub mod config;
pub mod constants;
pub mod crd;
pub mod error;
pub mod export;
pub mod git;
pub mod observability;
pub mod runtime;
pub mod server;
pub mod sync;
