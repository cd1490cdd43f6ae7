//! # Command Line
//!
//! Selects the configuration source and the run mode.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Mirror Kubernetes resources into git repositories
#[derive(Debug, Parser)]
#[command(name = "kube-versioner", version, about)]
pub struct Cli {
    /// Run a single synchronization pass and exit
    #[arg(long, global = true, env = "ONE_SHOT")]
    pub one_shot: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Read ExportConfig and GitConfig custom resources from the cluster
    KubeController,
    /// Read ExportConfig and GitConfig manifests from a YAML file
    File {
        /// Path of the manifest file
        #[arg(short, long, env = "VERSIONER_CONFIG", default_value = "versioner.yaml")]
        path: PathBuf,
    },
}
