//! # Error Handling Unit Tests
//!
//! These tests verify:
//! - Aggregation of configuration errors
//! - Error messages carry the identifying context
//! - Source chains are preserved for sync failures

use kube_versioner::error::{ConfigurationError, GitError, ListError, LocateError, SyncError};
use std::error::Error;

fn invalid(field: &'static str) -> ConfigurationError {
    ConfigurationError::InvalidField {
        kind: "GitConfig",
        name: "audit".to_string(),
        field,
        reason: "must not be empty".to_string(),
    }
}

#[test]
fn test_from_many_empty_is_none() {
    assert!(ConfigurationError::from_many(Vec::new()).is_none());
}

#[test]
fn test_from_many_single_error_is_unwrapped() {
    let error = ConfigurationError::from_many(vec![invalid("branch")]).expect("Should return an error");
    assert!(matches!(error, ConfigurationError::InvalidField { field: "branch", .. }));
    assert_eq!(
        error.to_string(),
        "GitConfig 'audit': field 'branch' must not be empty"
    );
}

#[test]
fn test_from_many_reports_every_error() {
    let error = ConfigurationError::from_many(vec![invalid("branch"), invalid("repositoryPath"), invalid("username")])
        .expect("Should return an error");
    match &error {
        ConfigurationError::Multiple(errors) => {
            assert_eq!(errors.len(), 3);
            assert!(matches!(errors[0], ConfigurationError::InvalidField { field: "branch", .. }));
        }
        other => panic!("Expected Multiple, got {other:?}"),
    }
    let message = error.to_string();
    assert!(message.starts_with("3 configuration errors: "));
    for field in ["'branch'", "'repositoryPath'", "'username'"] {
        assert!(message.contains(field), "{field} missing from: {message}");
    }
}

#[test]
fn test_missing_git_target_message_names_both_sides() {
    let error = ConfigurationError::MissingGitTarget {
        tenant: "workloads".to_string(),
        git_ref: "audit".to_string(),
        namespace: "versioner".to_string(),
    };
    let message = error.to_string();
    assert!(message.contains("'workloads'"));
    assert!(message.contains("'audit'"));
    assert!(message.contains("'versioner'"));
}

#[test]
fn test_locate_and_list_messages() {
    let locate = LocateError::Discovery {
        kind: "Widget".to_string(),
        api_version: "example.com/v1".to_string(),
        reason: "not served".to_string(),
    };
    assert_eq!(locate.to_string(), "no resource mapping for Widget in example.com/v1: not served");

    let list = ListError {
        resource: "pods.v1".to_string(),
        namespace: "kube-system".to_string(),
        reason: "forbidden".to_string(),
    };
    assert_eq!(
        list.to_string(),
        "failed to list pods.v1 in namespace 'kube-system': forbidden"
    );
}

#[test]
fn test_sync_error_preserves_source_chain() {
    let error = SyncError::Push {
        branch: "main".to_string(),
        source: GitError::PushRejected {
            refname: "refs/heads/main".to_string(),
            message: "non-fast-forward".to_string(),
        },
    };
    assert!(error.to_string().contains("'main'"));
    let source = error.source().expect("Push failure should carry its cause");
    assert!(source.to_string().contains("non-fast-forward"));
}

#[test]
fn test_configuration_sync_error_wraps_cause() {
    let error = SyncError::Configuration(invalid("sshPrivateKeyPath"));
    let source = error.source().expect("Configuration failure should carry its cause");
    assert!(source.to_string().contains("sshPrivateKeyPath"));
}
