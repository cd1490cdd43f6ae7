//! # Resource Fetcher
//!
//! Lists live objects and turns each one into a manifest ready to be written:
//! selector and exclusion matching, field stripping, canonical key order and
//! serialization.

use crate::cluster::{ClusterProvider, ResourceRecord, RestMapping};
use crate::crd::{ExportConfigSpec, OutputType, ResourceFilter};
use crate::error::{ListError, SerializationError};
use crate::export::paths::resource_path;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A manifest ready to be written into a working copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedResource {
    /// Path relative to the working copy root
    pub path: String,
    pub contents: Vec<u8>,
}

/// Lists objects and renders them as manifests
#[derive(Clone)]
pub struct ResourceFetcher {
    provider: Arc<dyn ClusterProvider>,
}

impl std::fmt::Debug for ResourceFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceFetcher").finish_non_exhaustive()
    }
}

impl ResourceFetcher {
    pub fn new(provider: Arc<dyn ClusterProvider>) -> Self {
        Self { provider }
    }

    /// Complete list of `mapping` objects in `namespace` (empty = cluster-wide)
    pub async fn list(
        &self,
        mapping: &RestMapping,
        namespace: &str,
    ) -> Result<Vec<ResourceRecord>, ListError> {
        self.provider
            .list(mapping, namespace)
            .await
            .map_err(|e| ListError {
                resource: mapping.to_string(),
                namespace: namespace.to_string(),
                reason: format!("{e:#}"),
            })
    }
}

/// Render one record for a tenant
///
/// Returns `Ok(None)` when the tenant's selectors or exclusions leave the record out.
pub fn render(
    mut record: ResourceRecord,
    filter: &ResourceFilter,
    spec: &ExportConfigSpec,
) -> Result<Option<ExportedResource>, SerializationError> {
    if !matches_selectors(&record, &spec.labels, &spec.annotations) {
        return Ok(None);
    }
    if spec
        .exclude_resource
        .iter()
        .any(|exclusion| is_excluded(&record, exclusion))
    {
        return Ok(None);
    }

    let name = metadata_str(&record, "name")
        .ok_or(SerializationError::MissingName)?
        .to_string();
    let namespace = metadata_str(&record, "namespace").unwrap_or_default().to_string();
    let kind = record
        .get("kind")
        .and_then(Value::as_str)
        .unwrap_or(filter.kind())
        .to_string();

    strip_fields(&mut record, filter);
    let contents = serialize(&record, spec.output_type)?;

    Ok(Some(ExportedResource {
        path: resource_path(&namespace, &kind, &name),
        contents,
    }))
}

/// Every required label and annotation must be present with an equal value
pub fn matches_selectors(
    record: &ResourceRecord,
    labels: &BTreeMap<String, String>,
    annotations: &BTreeMap<String, String>,
) -> bool {
    let subset = |field: &str, required: &BTreeMap<String, String>| {
        required.iter().all(|(key, value)| {
            record
                .pointer(&format!("/metadata/{field}"))
                .and_then(|map| map.get(key))
                .and_then(Value::as_str)
                == Some(value.as_str())
        })
    };
    subset("labels", labels) && subset("annotations", annotations)
}

/// Whether `exclusion` names this record
///
/// Kind and apiVersion must match; `resourceName` and `namespace` narrow the
/// match further when set.
pub fn is_excluded(record: &ResourceRecord, exclusion: &ResourceFilter) -> bool {
    let field = |key: &str| record.get(key).and_then(Value::as_str).unwrap_or_default();
    if field("kind") != exclusion.name || field("apiVersion") != exclusion.api_version {
        return false;
    }
    if let Some(name) = &exclusion.resource_name {
        if metadata_str(record, "name") != Some(name.as_str()) {
            return false;
        }
    }
    if let Some(namespace) = &exclusion.namespace {
        if metadata_str(record, "namespace").unwrap_or_default() != namespace {
            return false;
        }
    }
    true
}

/// Remove `metadata.managedFields` and `status` unless the filter keeps them
pub fn strip_fields(record: &mut ResourceRecord, filter: &ResourceFilter) {
    if !filter.with_managed_fields {
        if let Some(metadata) = record.get_mut("metadata").and_then(Value::as_object_mut) {
            metadata.remove("managedFields");
        }
    }
    if !filter.with_status_field {
        if let Some(object) = record.as_object_mut() {
            object.remove("status");
        }
    }
}

/// Serialize with keys sorted at every level
///
/// YAML is block style; JSON is indented with two spaces. Both end in a newline.
pub fn serialize(record: &ResourceRecord, output: OutputType) -> Result<Vec<u8>, SerializationError> {
    let canonical = canonicalize(record.clone());
    match output {
        OutputType::Yaml => Ok(serde_yaml::to_string(&canonical)?.into_bytes()),
        OutputType::Json => {
            let mut bytes = serde_json::to_vec_pretty(&canonical)?;
            bytes.push(b'\n');
            Ok(bytes)
        }
    }
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, canonicalize(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

fn metadata_str<'a>(record: &'a ResourceRecord, key: &str) -> Option<&'a str> {
    record
        .get("metadata")
        .and_then(|metadata| metadata.get(key))
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config_map() -> ResourceRecord {
        json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {
                "name": "app-config",
                "namespace": "default",
                "labels": {"tier": "web", "team": "core"},
                "annotations": {"owner": "platform"},
                "managedFields": [{"manager": "kubectl"}]
            },
            "data": {"b": "2", "a": "1"},
            "status": {"phase": "Active"}
        })
    }

    fn spec(output_type: OutputType) -> ExportConfigSpec {
        ExportConfigSpec {
            namespace: "default".into(),
            include_resource: vec![ResourceFilter::new("v1", "ConfigMap")],
            exclude_resource: Vec::new(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            output_type,
            git_ref: "audit".into(),
            folder_structure: String::new(),
        }
    }

    #[test]
    fn test_label_selector_is_conjunction() {
        let record = config_map();
        let mut labels = BTreeMap::from([("tier".to_string(), "web".to_string())]);
        assert!(matches_selectors(&record, &labels, &BTreeMap::new()));
        labels.insert("team".into(), "other".into());
        assert!(!matches_selectors(&record, &labels, &BTreeMap::new()));
    }

    #[test]
    fn test_annotation_selector_requires_presence() {
        let record = config_map();
        let annotations = BTreeMap::from([("missing".to_string(), "x".to_string())]);
        assert!(!matches_selectors(&record, &BTreeMap::new(), &annotations));
        let annotations = BTreeMap::from([("owner".to_string(), "platform".to_string())]);
        assert!(matches_selectors(&record, &BTreeMap::new(), &annotations));
    }

    #[test]
    fn test_exclusion_by_name_and_namespace() {
        let record = config_map();
        let mut exclusion = ResourceFilter::new("v1", "ConfigMap");
        assert!(is_excluded(&record, &exclusion));

        exclusion.resource_name = Some("other".into());
        assert!(!is_excluded(&record, &exclusion));
        exclusion.resource_name = Some("app-config".into());
        exclusion.namespace = Some("kube-system".into());
        assert!(!is_excluded(&record, &exclusion));
        exclusion.namespace = Some("default".into());
        assert!(is_excluded(&record, &exclusion));

        assert!(!is_excluded(&record, &ResourceFilter::new("v1", "Secret")));
        assert!(!is_excluded(&record, &ResourceFilter::new("v2", "ConfigMap")));
    }

    #[test]
    fn test_strip_fields_defaults() {
        let mut record = config_map();
        strip_fields(&mut record, &ResourceFilter::new("v1", "ConfigMap"));
        assert!(record.pointer("/metadata/managedFields").is_none());
        assert!(record.get("status").is_none());
    }

    #[test]
    fn test_strip_fields_kept_when_requested() {
        let mut record = config_map();
        let filter = ResourceFilter {
            with_managed_fields: true,
            with_status_field: true,
            ..ResourceFilter::new("v1", "ConfigMap")
        };
        strip_fields(&mut record, &filter);
        assert!(record.pointer("/metadata/managedFields").is_some());
        assert_eq!(record.pointer("/status/phase"), Some(&json!("Active")));
    }

    #[test]
    fn test_render_yaml_sorted_and_stripped() {
        let filter = ResourceFilter::new("v1", "ConfigMap");
        let exported = render(config_map(), &filter, &spec(OutputType::Yaml))
            .unwrap()
            .unwrap();
        assert_eq!(exported.path, "default/ConfigMap/app-config.yaml");
        let text = String::from_utf8(exported.contents).unwrap();
        assert!(text.starts_with("apiVersion: v1\n"));
        assert!(text.find("\n  a: ").unwrap() < text.find("\n  b: ").unwrap());
        assert!(!text.contains("managedFields"));
        assert!(!text.contains("status"));
    }

    #[test]
    fn test_render_json_two_space_indent() {
        let filter = ResourceFilter::new("v1", "ConfigMap");
        let exported = render(config_map(), &filter, &spec(OutputType::Json))
            .unwrap()
            .unwrap();
        assert_eq!(exported.path, "default/ConfigMap/app-config.yaml");
        let text = String::from_utf8(exported.contents).unwrap();
        assert!(text.starts_with("{\n  \"apiVersion\": \"v1\",\n"));
        assert!(text.ends_with("}\n"));
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["data"]["a"], "1");
    }

    #[test]
    fn test_render_is_byte_stable() {
        let filter = ResourceFilter::new("v1", "ConfigMap");
        let first = render(config_map(), &filter, &spec(OutputType::Yaml)).unwrap();
        let second = render(config_map(), &filter, &spec(OutputType::Yaml)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_render_skips_excluded_record() {
        let filter = ResourceFilter::new("v1", "ConfigMap");
        let mut spec = spec(OutputType::Yaml);
        spec.exclude_resource.push(ResourceFilter {
            resource_name: Some("app-config".into()),
            ..ResourceFilter::new("v1", "ConfigMap")
        });
        assert_eq!(render(config_map(), &filter, &spec).unwrap(), None);
    }

    #[test]
    fn test_render_cluster_scoped() {
        let record = json!({
            "apiVersion": "rbac.authorization.k8s.io/v1",
            "kind": "ClusterRole",
            "metadata": {"name": "view"}
        });
        let filter = ResourceFilter::new("rbac.authorization.k8s.io/v1", "ClusterRole");
        let exported = render(record, &filter, &spec(OutputType::Yaml)).unwrap().unwrap();
        assert_eq!(exported.path, "_cluster/ClusterRole/view.yaml");
    }

    #[test]
    fn test_render_requires_name() {
        let record = json!({"apiVersion": "v1", "kind": "ConfigMap", "metadata": {}});
        let filter = ResourceFilter::new("v1", "ConfigMap");
        let err = render(record, &filter, &spec(OutputType::Yaml)).unwrap_err();
        assert!(matches!(err, SerializationError::MissingName));
    }
}
