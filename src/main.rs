//! # kube-versioner
//!
//! Periodically mirrors selected Kubernetes resources into git repositories for
//! audit, diffing and history.
//!
//! ## Usage
//!
//! ```bash
//! # Configuration from ExportConfig/GitConfig custom resources, pass every 5 minutes
//! kube-versioner kube-controller
//!
//! # Configuration from a manifest file, single pass
//! kube-versioner --one-shot file --path versioner.yaml
//! ```

use clap::Parser;
use kube_versioner::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    kube_versioner::runtime::run(Cli::parse()).await
}
