//! # CRD Generator
//!
//! Prints the `ExportConfig` and `GitConfig` CustomResourceDefinitions as a
//! multi-document YAML stream.
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/versioner.yaml
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use kube::core::CustomResourceExt;
use kube_versioner::crd::{ExportConfig, GitConfig};

fn main() -> anyhow::Result<()> {
    for crd in [ExportConfig::crd(), GitConfig::crd()] {
        print!("---\n{}", serde_yaml::to_string(&crd)?);
    }
    Ok(())
}
