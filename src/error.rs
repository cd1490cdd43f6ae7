//! # Errors
//!
//! Error taxonomy for the synchronization engine.
//!
//! Every kind has a fixed blast radius:
//!
//! | Error | Scope of failure |
//! |---|---|
//! | [`ConfigurationError`] | whole reload rejected, previous catalog kept |
//! | [`LocateError::Configuration`] | one resource filter, never reaches discovery |
//! | [`LocateError::Discovery`] | one resource filter |
//! | [`ListError`] | one (mapping, namespace) combination |
//! | [`SerializationError`] | one record |
//! | [`GitError`] / [`SyncError`] | one git target for the current pass |

use std::path::PathBuf;
use thiserror::Error;

/// Invalid or inconsistent configuration detected while building a catalog
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("failed to load configuration source: {0}")]
    Source(String),

    #[error("failed to read configuration file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration document: {0}")]
    Parse(String),

    #[error("{kind} '{name}': field '{field}' {reason}")]
    InvalidField {
        kind: &'static str,
        name: String,
        field: &'static str,
        reason: String,
    },

    #[error("ExportConfig '{tenant}' references GitConfig '{git_ref}' in namespace '{namespace}' which does not exist")]
    MissingGitTarget {
        tenant: String,
        git_ref: String,
        namespace: String,
    },

    #[error("duplicate {kind} '{name}'")]
    Duplicate { kind: &'static str, name: String },

    #[error("{} configuration errors: {}", .0.len(), join_messages(.0))]
    Multiple(Vec<ConfigurationError>),
}

impl ConfigurationError {
    /// Collapse a list of validation failures into a single error
    pub fn from_many(mut errors: Vec<ConfigurationError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(errors)),
        }
    }
}

fn join_messages(errors: &[ConfigurationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failure to turn an (apiVersion, kind) filter into a listable resource
#[derive(Debug, Error)]
pub enum LocateError {
    /// The filter itself is invalid; discovery is never consulted
    #[error("invalid resource filter (kind '{kind}', apiVersion '{api_version}'): {reason}")]
    Configuration {
        kind: String,
        api_version: String,
        reason: &'static str,
    },

    /// Discovery could not map the kind
    #[error("no resource mapping for {kind} in {api_version}: {reason}")]
    Discovery {
        kind: String,
        api_version: String,
        reason: String,
    },
}

/// A list call failed for one resource identity and namespace
#[derive(Debug, Error)]
#[error("failed to list {resource} in namespace '{namespace}': {reason}")]
pub struct ListError {
    pub resource: String,
    pub namespace: String,
    pub reason: String,
}

/// A single record could not be serialized
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record has no metadata.name")]
    MissingName,
}

/// Version-control and working-copy failures
#[derive(Debug, Error)]
pub enum GitError {
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("refusing to write outside the working copy: '{0}'")]
    PathEscapesWorkingCopy(String),

    #[error("push of '{refname}' rejected by remote: {message}")]
    PushRejected { refname: String, message: String },

    #[error("branch '{0}' has no commits")]
    EmptyBranch(String),

    #[error("{operation} is not allowed while the repository is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("git task aborted: {0}")]
    Task(String),
}

/// Failure that aborts the remaining work of one git target in the current pass
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("git target is not usable: {0}")]
    Configuration(#[source] ConfigurationError),

    #[error("failed to materialize working copy at '{path}': {source}")]
    Materialize {
        path: PathBuf,
        #[source]
        source: GitError,
    },

    #[error("failed to commit: {0}")]
    Commit(#[source] GitError),

    #[error("failed to push branch '{branch}': {source}")]
    Push {
        branch: String,
        #[source]
        source: GitError,
    },
}
