//! # Validation Unit Tests
//!
//! These tests verify:
//! - Repository location validation per protocol
//! - GitConfig field validation
//! - ExportConfig field validation
//! - Include filter checks applied at resolve time

use kube_versioner::catalog::{validate_export, validate_git, validate_repository_url};
use kube_versioner::crd::{ExportConfigSpec, GitConfigSpec, GitProtocol, OutputType, ResourceFilter};
use kube_versioner::error::ConfigurationError;
use kube_versioner::export::check_filter;

fn git_spec(protocol: GitProtocol, url: &str) -> GitConfigSpec {
    GitConfigSpec {
        protocol,
        repository_url: url.to_string(),
        branch: "main".to_string(),
        username: Some("ci".to_string()),
        password: Some("token".to_string()),
        ssh_private_key_path: Some("/etc/versioner/id_ed25519".to_string()),
        repository_path: "/var/lib/versioner".to_string(),
        repository_folder: "audit".to_string(),
        dry_run: false,
    }
}

fn export_spec() -> ExportConfigSpec {
    ExportConfigSpec {
        namespace: "all".to_string(),
        include_resource: vec![ResourceFilter::new("apps/v1", "Deployment")],
        exclude_resource: Vec::new(),
        labels: Default::default(),
        annotations: Default::default(),
        output_type: OutputType::Yaml,
        git_ref: "audit".to_string(),
        folder_structure: "{namespace}/{kind}/{name}".to_string(),
    }
}

fn invalid_fields(errors: &[ConfigurationError]) -> Vec<&'static str> {
    errors
        .iter()
        .filter_map(|e| match e {
            ConfigurationError::InvalidField { field, .. } => Some(*field),
            _ => None,
        })
        .collect()
}

#[test]
fn test_validate_repository_url_valid() {
    let valid = vec![
        (GitProtocol::Https, "https://github.com/acme/audit.git"),
        (GitProtocol::Https, "github.com/acme/audit.git"),
        (GitProtocol::Http, "git.internal:8080/ops/audit"),
        (GitProtocol::Https, "file:///srv/git/audit.git"),
        (GitProtocol::Ssh, "git@github.com:acme/audit.git"),
        (GitProtocol::Ssh, "github.com:acme/audit.git"),
        (GitProtocol::Ssh, "ssh://git@github.com/acme/audit.git"),
    ];

    for (protocol, url) in valid {
        assert!(
            validate_repository_url(protocol, url).is_ok(),
            "'{url}' should be valid for {protocol}"
        );
    }
}

#[test]
fn test_validate_repository_url_invalid() {
    let invalid = vec![
        (GitProtocol::Https, ""),
        (GitProtocol::Https, "   "),
        (GitProtocol::Https, "ssh://git@github.com/acme/audit.git"),
        (GitProtocol::Https, "git@github.com:acme/audit.git"),
        (GitProtocol::Https, "not a url"),
        (GitProtocol::Ssh, "https://github.com/acme/audit.git"),
        (GitProtocol::Ssh, "github.com/acme/audit.git"),
    ];

    for (protocol, url) in invalid {
        assert!(
            validate_repository_url(protocol, url).is_err(),
            "'{url}' should be invalid for {protocol}"
        );
    }
}

#[test]
fn test_validate_git_accepts_complete_spec() {
    assert!(validate_git("audit", &git_spec(GitProtocol::Https, "github.com/acme/audit.git")).is_empty());
    assert!(validate_git("audit", &git_spec(GitProtocol::Ssh, "git@github.com:acme/audit.git")).is_empty());
}

#[test]
fn test_validate_git_collects_every_problem() {
    let mut spec = git_spec(GitProtocol::Https, "github.com/acme/audit.git");
    spec.branch = "bad..branch".to_string();
    spec.repository_folder = "../escape".to_string();
    spec.username = None;
    spec.password = Some(String::new());

    let errors = validate_git("audit", &spec);
    let fields = invalid_fields(&errors);
    assert_eq!(fields, vec!["branch", "repositoryFolder", "username", "password"]);
}

#[test]
fn test_validate_git_ssh_requires_private_key() {
    let mut spec = git_spec(GitProtocol::Ssh, "git@github.com:acme/audit.git");
    spec.ssh_private_key_path = None;
    spec.username = None;
    spec.password = None;

    let fields = invalid_fields(&validate_git("audit", &spec));
    assert_eq!(fields, vec!["sshPrivateKeyPath"]);
}

#[test]
fn test_validate_git_file_remote_needs_no_credentials() {
    let mut spec = git_spec(GitProtocol::Https, "file:///srv/git/audit.git");
    spec.username = None;
    spec.password = None;
    assert!(validate_git("audit", &spec).is_empty());
}

#[test]
fn test_validate_export_requires_git_ref() {
    let mut spec = export_spec();
    spec.git_ref = "  ".to_string();
    let fields = invalid_fields(&validate_export("platform", &spec));
    assert_eq!(fields, vec!["gitRef"]);
}

#[test]
fn test_validate_export_accepts_complete_spec() {
    assert!(validate_export("platform", &export_spec()).is_empty());
}

#[test]
fn test_check_filter() {
    let valid = vec![("apps/v1", "Deployment"), ("v1", "ConfigMap"), ("rbac.authorization.k8s.io/v1", "Role")];
    for (api_version, kind) in valid {
        assert!(
            check_filter(api_version, kind).is_ok(),
            "{api_version} {kind} should be accepted"
        );
    }

    let invalid = vec![("", "Pod"), ("v1", ""), ("*", "Pod"), ("v1", "*")];
    for (api_version, kind) in invalid {
        assert!(
            check_filter(api_version, kind).is_err(),
            "'{api_version}' '{kind}' should be rejected"
        );
    }
}
