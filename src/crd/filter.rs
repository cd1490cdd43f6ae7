//! # Resource Filters
//!
//! Filter entries used by `includeResource` and `excludeResource`.

use serde::{Deserialize, Serialize};

/// Selects one resource type, and for exclusions optionally one object
///
/// `name` is the resource kind (e.g. `Deployment`), `apiVersion` its group/version
/// (e.g. `apps/v1`). Neither may be empty or the wildcard `*`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceFilter {
    /// Resource kind
    pub name: String,
    /// API version of the kind
    pub api_version: String,
    /// Keep `metadata.managedFields` in the exported manifest
    #[serde(default)]
    pub with_managed_fields: bool,
    /// Keep the top-level `status` subtree in the exported manifest
    #[serde(default)]
    pub with_status_field: bool,
    /// Exclusions only: restrict the match to objects with this name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
    /// Exclusions only: restrict the match to objects in this namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl ResourceFilter {
    /// Filter for a kind with managed fields and status both stripped
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: kind.into(),
            api_version: api_version.into(),
            ..Self::default()
        }
    }

    /// The kind this filter selects
    pub fn kind(&self) -> &str {
        &self.name
    }
}
