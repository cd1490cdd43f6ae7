//! # Configuration Validation
//!
//! Load-time checks applied to every document before a catalog is swapped in.
//! Include filters are only warned about here: an invalid filter is rejected on
//! its own at resolve time without affecting the rest of the tenant.

use crate::crd::{ExportConfigSpec, GitConfigSpec, GitProtocol};
use crate::error::ConfigurationError;
use crate::export::check_filter;
use regex::Regex;
use std::sync::LazyLock;

/// `scheme://[authority]/path`
static SCHEME_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<scheme>[A-Za-z][A-Za-z0-9+.-]*)://[^\s/]*(/\S*)?$")
        .expect("Failed to compile SCHEME_URL regex - this should never happen")
});

/// Scheme-less `host[:port]/path` accepted for http(s)
static HOST_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9.-]*(:\d+)?/\S+$")
        .expect("Failed to compile HOST_PATH regex - this should never happen")
});

/// scp-like `[user@]host:path` accepted for ssh
static SCP_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9._-]+@)?[A-Za-z0-9][A-Za-z0-9.-]*:[^/\s]\S*$")
        .expect("Failed to compile SCP_LIKE regex - this should never happen")
});

/// Check an ExportConfig spec
pub fn validate_export(name: &str, spec: &ExportConfigSpec) -> Vec<ConfigurationError> {
    let mut errors = Vec::new();
    let invalid = |field: &'static str, reason: &str| ConfigurationError::InvalidField {
        kind: "ExportConfig",
        name: name.to_string(),
        field,
        reason: reason.to_string(),
    };

    if name.is_empty() {
        errors.push(invalid("metadata.name", "must not be empty"));
    }
    if spec.git_ref.trim().is_empty() {
        errors.push(invalid("gitRef", "must not be empty"));
    }
    for exclusion in &spec.exclude_resource {
        if exclusion.name.trim().is_empty() || exclusion.api_version.trim().is_empty() {
            errors.push(invalid("excludeResource", "entries need both name and apiVersion"));
        }
    }
    errors
}

/// Include filters that will be skipped at resolve time
pub fn include_filter_warnings(spec: &ExportConfigSpec) -> Vec<String> {
    spec.include_resource
        .iter()
        .filter_map(|filter| check_filter(&filter.api_version, filter.kind()).err())
        .map(|e| e.to_string())
        .collect()
}

/// Check a GitConfig spec
pub fn validate_git(name: &str, spec: &GitConfigSpec) -> Vec<ConfigurationError> {
    let mut errors = Vec::new();
    let invalid = |field: &'static str, reason: String| ConfigurationError::InvalidField {
        kind: "GitConfig",
        name: name.to_string(),
        field,
        reason,
    };

    if name.is_empty() {
        errors.push(invalid("metadata.name", "must not be empty".into()));
    }
    if let Err(reason) = validate_repository_url(spec.protocol, &spec.repository_url) {
        errors.push(invalid("repositoryUrl", reason));
    }
    if spec.branch.trim().is_empty() {
        errors.push(invalid("branch", "must not be empty".into()));
    } else if !git2::Branch::name_is_valid(&spec.branch).unwrap_or(false) {
        errors.push(invalid("branch", format!("'{}' is not a valid branch name", spec.branch)));
    }
    if spec.repository_path.trim().is_empty() {
        errors.push(invalid("repositoryPath", "must not be empty".into()));
    }
    let folder = spec.repository_folder.trim();
    if folder.is_empty() || folder == "." || folder == ".." || folder.contains(['/', '\\']) {
        errors.push(invalid(
            "repositoryFolder",
            "must be a single directory name".into(),
        ));
    }
    let has_key = spec
        .ssh_private_key_path
        .as_deref()
        .is_some_and(|path| !path.trim().is_empty());
    if spec.protocol == GitProtocol::Ssh && !has_key {
        errors.push(invalid(
            "sshPrivateKeyPath",
            "is required for the ssh protocol".into(),
        ));
    }
    // Local file remotes need no credentials
    let remote = spec.remote_url();
    if spec.protocol != GitProtocol::Ssh && !remote.starts_with("file://") {
        let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.is_empty());
        if !present(&spec.username) {
            errors.push(invalid("username", format!("is required for the {} protocol", spec.protocol)));
        }
        if !present(&spec.password) {
            errors.push(invalid("password", format!("is required for the {} protocol", spec.protocol)));
        }
    }
    errors
}

/// Check that `url` is usable with `protocol`
pub fn validate_repository_url(protocol: GitProtocol, url: &str) -> Result<(), String> {
    let url = url.trim();
    if url.is_empty() {
        return Err("must not be empty".to_string());
    }
    let scheme = SCHEME_URL
        .captures(url)
        .and_then(|caps| caps.name("scheme"))
        .map(|m| m.as_str().to_ascii_lowercase());

    let accepted = match (protocol, scheme.as_deref()) {
        (GitProtocol::Http | GitProtocol::Https, Some("http" | "https" | "file")) => true,
        (GitProtocol::Http | GitProtocol::Https, None) => HOST_PATH.is_match(url),
        (GitProtocol::Ssh, Some("ssh" | "file")) => true,
        (GitProtocol::Ssh, None) => SCP_LIKE.is_match(url),
        (_, Some(_)) => false,
    };
    if accepted {
        Ok(())
    } else {
        Err(format!("'{url}' is not a valid {protocol} repository location"))
    }
}
