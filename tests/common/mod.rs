//! Common test utilities for synchronization tests
//!
//! - [`MemoryCluster`]: in-memory `ClusterProvider` that records every call
//! - [`bare_remote`]: bare git repository seeded with one commit on `main`
//! - [`rewind_remote_branch`] / [`append_remote_commit`]: changes made to a remote behind the engine's back
//! - [`CountingBackend`]: git2 backend that counts push invocations
//! - builders for `ExportConfig` / `GitConfig` documents

#![allow(dead_code, reason = "each test binary uses a different subset")]

use anyhow::{bail, Result};
use async_trait::async_trait;
use git2::{Repository, Signature};
use kube::core::GroupVersionKind;
use kube_versioner::catalog::CatalogDocument;
use kube_versioner::cluster::{ClusterProvider, ResourceRecord, RestMapping};
use kube_versioner::crd::{
    ExportConfig, ExportConfigSpec, GitConfig, GitConfigSpec, GitProtocol, OutputType,
    ResourceFilter,
};
use kube_versioner::error::GitError;
use kube_versioner::git::{
    CommitOutcome, Git2Backend, GitAuth, Materialization, PushOutcome, VersionControl,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Namespace holding the configuration objects in tests
pub const CONFIG_NAMESPACE: &str = "versioner";

/// In-memory cluster
#[derive(Debug, Default)]
pub struct MemoryCluster {
    mappings: Vec<RestMapping>,
    objects: Vec<ResourceRecord>,
    namespaces: Vec<String>,
    failing_namespaces: HashSet<String>,
    discoveries: AtomicUsize,
    list_calls: Mutex<Vec<(String, String)>>,
}

impl MemoryCluster {
    /// Cluster knowing Pods, ConfigMaps, Deployments and ClusterRoles
    pub fn new(namespaces: &[&str]) -> Self {
        Self {
            mappings: vec![
                RestMapping::new(GroupVersionKind::gvk("", "v1", "Pod"), "pods", true),
                RestMapping::new(GroupVersionKind::gvk("", "v1", "ConfigMap"), "configmaps", true),
                RestMapping::new(GroupVersionKind::gvk("apps", "v1", "Deployment"), "deployments", true),
                RestMapping::new(
                    GroupVersionKind::gvk("rbac.authorization.k8s.io", "v1", "ClusterRole"),
                    "clusterroles",
                    false,
                ),
            ],
            namespaces: namespaces.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    pub fn with_object(mut self, object: Value) -> Self {
        self.objects.push(object);
        self
    }

    /// Every list call in `namespace` fails
    pub fn with_failing_namespace(mut self, namespace: &str) -> Self {
        self.failing_namespaces.insert(namespace.to_string());
        self
    }

    pub fn discoveries(&self) -> usize {
        self.discoveries.load(Ordering::SeqCst)
    }

    /// `(resource, namespace)` of every list call so far
    pub fn list_calls(&self) -> Vec<(String, String)> {
        self.list_calls.lock().expect("list_calls lock").clone()
    }
}

#[async_trait]
impl ClusterProvider for MemoryCluster {
    async fn discover(&self, gvk: &GroupVersionKind) -> Result<RestMapping> {
        self.discoveries.fetch_add(1, Ordering::SeqCst);
        match self.mappings.iter().find(|mapping| &mapping.gvk == gvk) {
            Some(mapping) => Ok(mapping.clone()),
            None => bail!("no matches for kind \"{}\" in version \"{}\"", gvk.kind, gvk.api_version()),
        }
    }

    async fn list(&self, mapping: &RestMapping, namespace: &str) -> Result<Vec<ResourceRecord>> {
        self.list_calls
            .lock()
            .expect("list_calls lock")
            .push((mapping.to_string(), namespace.to_string()));
        if self.failing_namespaces.contains(namespace) {
            bail!("connection reset while listing {mapping} in {namespace}");
        }
        let api_version = mapping.api_version();
        Ok(self
            .objects
            .iter()
            .filter(|object| object["apiVersion"] == api_version.as_str())
            .filter(|object| object["kind"] == mapping.kind())
            .filter(|object| {
                namespace.is_empty() || object["metadata"]["namespace"] == namespace
            })
            .cloned()
            .collect())
    }

    async fn list_namespaces(&self) -> Result<Vec<String>> {
        Ok(self.namespaces.clone())
    }
}

pub fn pod(namespace: &str, name: &str) -> Value {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "labels": {"app": name},
            "managedFields": [{"manager": "kubelet", "operation": "Update"}]
        },
        "spec": {"containers": [{"name": "main", "image": "nginx:1.27"}]},
        "status": {"phase": "Running", "podIP": "10.0.0.12"}
    })
}

pub fn config_map(namespace: &str, name: &str, labels: &[(&str, &str)]) -> Value {
    let labels: BTreeMap<&str, &str> = labels.iter().copied().collect();
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {"name": name, "namespace": namespace, "labels": labels},
        "data": {"key": "value"}
    })
}

pub fn cluster_role(name: &str) -> Value {
    serde_json::json!({
        "apiVersion": "rbac.authorization.k8s.io/v1",
        "kind": "ClusterRole",
        "metadata": {"name": name},
        "rules": [{"apiGroups": [""], "resources": ["pods"], "verbs": ["get"]}]
    })
}

/// Bare repository at `root/<name>.git` with one commit on `main`
pub fn bare_remote(root: &Path, name: &str) -> PathBuf {
    let path = root.join(format!("{name}.git"));
    let repo = Repository::init_bare(&path).expect("init bare remote");
    let blob = repo.blob(b"# cluster audit\n").expect("write blob");
    let mut builder = repo.treebuilder(None).expect("treebuilder");
    builder.insert("README.md", blob, 0o100_644).expect("insert README");
    let tree_id = builder.write().expect("write tree");
    let tree = repo.find_tree(tree_id).expect("find tree");
    let signature = Signature::now("fixture", "fixture@example.com").expect("signature");
    repo.commit(Some("refs/heads/main"), &signature, &signature, "Initial commit", &tree, &[])
        .expect("initial commit");
    repo.set_head("refs/heads/main").expect("set HEAD");
    path
}

/// Move `refs/heads/main` of the bare repository at `path` back to its parent
pub fn rewind_remote_branch(path: &Path) {
    let repo = Repository::open_bare(path).expect("open bare remote");
    let head = repo
        .find_reference("refs/heads/main")
        .and_then(|reference| reference.peel_to_commit())
        .expect("remote head commit");
    let parent = head.parent_id(0).expect("remote head should have a parent");
    repo.reference("refs/heads/main", parent, true, "rewind for test")
        .expect("rewind main");
}

/// Commit `path_in_repo` directly on the remote's `main`, as another writer would
pub fn append_remote_commit(path: &Path, path_in_repo: &str) {
    let repo = Repository::open_bare(path).expect("open bare remote");
    let head = repo
        .find_reference("refs/heads/main")
        .and_then(|reference| reference.peel_to_commit())
        .expect("remote head commit");
    let blob = repo.blob(b"written elsewhere\n").expect("write blob");
    let mut builder = repo.treebuilder(Some(&head.tree().expect("head tree"))).expect("treebuilder");
    builder.insert(path_in_repo, blob, 0o100_644).expect("insert file");
    let tree_id = builder.write().expect("write tree");
    let tree = repo.find_tree(tree_id).expect("find tree");
    let signature = Signature::now("someone else", "other@example.com").expect("signature");
    repo.commit(Some("refs/heads/main"), &signature, &signature, "Foreign commit", &tree, &[&head])
        .expect("foreign commit");
}

pub fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// Number of commits reachable from `reference` in the repository at `path`
pub fn commit_count(path: &Path, reference: &str) -> usize {
    let repo = Repository::open(path).expect("open repository");
    let mut walk = repo.revwalk().expect("revwalk");
    walk.push_ref(reference).expect("push ref");
    walk.count()
}

pub fn filter(api_version: &str, kind: &str) -> ResourceFilter {
    ResourceFilter::new(api_version, kind)
}

pub fn export_config(
    name: &str,
    git_ref: &str,
    namespace_selector: &str,
    include: Vec<ResourceFilter>,
) -> ExportConfig {
    let mut config = ExportConfig::new(
        name,
        ExportConfigSpec {
            namespace: namespace_selector.to_string(),
            include_resource: include,
            exclude_resource: Vec::new(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            output_type: OutputType::Yaml,
            git_ref: git_ref.to_string(),
            folder_structure: "{namespace}/{kind}/{name}".to_string(),
        },
    );
    config.metadata.namespace = Some(CONFIG_NAMESPACE.to_string());
    config
}

pub fn git_config(name: &str, remote: &Path, work_root: &Path, dry_run: bool) -> GitConfig {
    let mut config = GitConfig::new(
        name,
        GitConfigSpec {
            protocol: GitProtocol::Https,
            repository_url: file_url(remote),
            branch: "main".to_string(),
            username: None,
            password: None,
            ssh_private_key_path: None,
            repository_path: work_root.display().to_string(),
            repository_folder: name.to_string(),
            dry_run,
        },
    );
    config.metadata.namespace = Some(CONFIG_NAMESPACE.to_string());
    config
}

pub fn document(exports: Vec<ExportConfig>, gits: Vec<GitConfig>) -> CatalogDocument {
    CatalogDocument { exports, gits }
}

/// Git2 backend that counts operations
#[derive(Debug)]
pub struct CountingBackend {
    inner: Git2Backend,
    pub commits: AtomicUsize,
    pub pushes: AtomicUsize,
}

impl CountingBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Git2Backend::new("kube-versioner-test", "test@example.com"),
            commits: AtomicUsize::new(0),
            pushes: AtomicUsize::new(0),
        })
    }

    pub fn pushes(&self) -> usize {
        self.pushes.load(Ordering::SeqCst)
    }
}

impl VersionControl for CountingBackend {
    fn clone_or_open(
        &self,
        url: &str,
        branch: &str,
        auth: &GitAuth,
        local_path: &Path,
    ) -> Result<Materialization, GitError> {
        self.inner.clone_or_open(url, branch, auth, local_path)
    }

    fn stage_all(&self, local_path: &Path) -> Result<(), GitError> {
        self.inner.stage_all(local_path)
    }

    fn commit(&self, local_path: &Path, message: &str) -> Result<CommitOutcome, GitError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        self.inner.commit(local_path, message)
    }

    fn push(&self, local_path: &Path, branch: &str, auth: &GitAuth) -> Result<PushOutcome, GitError> {
        self.pushes.fetch_add(1, Ordering::SeqCst);
        self.inner.push(local_path, branch, auth)
    }
}
