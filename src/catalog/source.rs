//! # Catalog Sources
//!
//! Where ExportConfig and GitConfig documents come from:
//!
//! - [`KubeCatalogSource`] lists the custom resources from the cluster
//! - [`FileCatalogSource`] reads a multi-document YAML file of the same manifests
//! - [`StaticCatalogSource`] serves a fixed document (embedding and tests)

use crate::crd::{ExportConfig, GitConfig};
use crate::error::ConfigurationError;
use async_trait::async_trait;
use kube::api::{Api, ListParams};
use kube::Client;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Unvalidated configuration documents
#[derive(Debug, Clone, Default)]
pub struct CatalogDocument {
    pub exports: Vec<ExportConfig>,
    pub gits: Vec<GitConfig>,
}

/// Produces the full set of configuration documents on demand
#[async_trait]
pub trait CatalogSource: Send + Sync + std::fmt::Debug {
    async fn load(&self) -> Result<CatalogDocument, ConfigurationError>;

    /// Human-readable origin for logs
    fn describe(&self) -> String;
}

/// Reads `ExportConfig` and `GitConfig` custom resources across all namespaces
#[derive(Clone)]
pub struct KubeCatalogSource {
    client: Client,
}

impl std::fmt::Debug for KubeCatalogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeCatalogSource").finish_non_exhaustive()
    }
}

impl KubeCatalogSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl CatalogSource for KubeCatalogSource {
    async fn load(&self) -> Result<CatalogDocument, ConfigurationError> {
        let exports: Api<ExportConfig> = Api::all(self.client.clone());
        let gits: Api<GitConfig> = Api::all(self.client.clone());
        let params = ListParams::default();

        let exports = exports
            .list(&params)
            .await
            .map_err(|e| ConfigurationError::Source(format!("listing ExportConfig: {e}")))?;
        let gits = gits
            .list(&params)
            .await
            .map_err(|e| ConfigurationError::Source(format!("listing GitConfig: {e}")))?;

        Ok(CatalogDocument {
            exports: exports.items,
            gits: gits.items,
        })
    }

    fn describe(&self) -> String {
        "cluster custom resources".to_string()
    }
}

/// Reads manifests from a YAML file
///
/// The file holds any number of `---`-separated documents; each is a single
/// manifest or a sequence of manifests. Only `ExportConfig` and `GitConfig`
/// kinds are accepted.
#[derive(Debug, Clone)]
pub struct FileCatalogSource {
    path: PathBuf,
}

impl FileCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse file contents into a document
    pub fn parse(content: &str) -> Result<CatalogDocument, ConfigurationError> {
        let mut document = CatalogDocument::default();
        for (index, part) in serde_yaml::Deserializer::from_str(content).enumerate() {
            let value = serde_yaml::Value::deserialize(part)
                .map_err(|e| ConfigurationError::Parse(format!("document {}: {e}", index + 1)))?;
            match value {
                serde_yaml::Value::Null => {}
                serde_yaml::Value::Sequence(items) => {
                    for item in items {
                        push_manifest(&mut document, item)?;
                    }
                }
                other => push_manifest(&mut document, other)?,
            }
        }
        Ok(document)
    }
}

fn push_manifest(
    document: &mut CatalogDocument,
    manifest: serde_yaml::Value,
) -> Result<(), ConfigurationError> {
    let kind = manifest
        .get("kind")
        .and_then(serde_yaml::Value::as_str)
        .map(str::to_string);
    let parse_error = |e: serde_yaml::Error| {
        ConfigurationError::Parse(format!("{}: {e}", kind.as_deref().unwrap_or("manifest")))
    };
    match kind.as_deref() {
        Some("ExportConfig") => document
            .exports
            .push(serde_yaml::from_value(manifest).map_err(parse_error)?),
        Some("GitConfig") => document
            .gits
            .push(serde_yaml::from_value(manifest).map_err(parse_error)?),
        Some(other) => {
            return Err(ConfigurationError::Parse(format!(
                "unsupported kind '{other}', expected ExportConfig or GitConfig"
            )))
        }
        None => return Err(ConfigurationError::Parse("manifest without kind".to_string())),
    }
    Ok(())
}

#[async_trait]
impl CatalogSource for FileCatalogSource {
    async fn load(&self) -> Result<CatalogDocument, ConfigurationError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| ConfigurationError::ReadFile {
                path: self.path.clone(),
                source,
            })?;
        Self::parse(&content)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// Serves a fixed document
#[derive(Debug, Clone, Default)]
pub struct StaticCatalogSource {
    document: CatalogDocument,
}

impl StaticCatalogSource {
    pub fn new(document: CatalogDocument) -> Self {
        Self { document }
    }
}

#[async_trait]
impl CatalogSource for StaticCatalogSource {
    async fn load(&self) -> Result<CatalogDocument, ConfigurationError> {
        Ok(self.document.clone())
    }

    fn describe(&self) -> String {
        "static document".to_string()
    }
}
