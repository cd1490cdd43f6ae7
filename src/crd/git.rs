//! # GitConfig
//!
//! Git target configuration: remote, branch, credentials and local working copy.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// GitConfig Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: versioner.kube-versioner.io/v1alpha1
/// kind: GitConfig
/// metadata:
///   name: audit-repo
///   namespace: versioner
/// spec:
///   protocol: ssh
///   repositoryUrl: git@github.com:acme/cluster-audit.git
///   branch: main
///   sshPrivateKeyPath: /etc/versioner/ssh/id_ed25519
///   repositoryPath: /var/lib/versioner
///   repositoryFolder: cluster-audit
///   dryRun: false
/// ```
#[derive(kube::CustomResource, Clone, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "GitConfig",
    group = "versioner.kube-versioner.io",
    version = "v1alpha1",
    namespaced,
    shortname = "gitc",
    printcolumn = r#"{"name":"Protocol", "type":"string", "jsonPath":".spec.protocol"}, {"name":"Branch", "type":"string", "jsonPath":".spec.branch"}, {"name":"DryRun", "type":"boolean", "jsonPath":".spec.dryRun"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct GitConfigSpec {
    /// Transport used to clone and push
    pub protocol: GitProtocol,
    /// Remote repository
    /// For http/https a scheme-less `host/path` is accepted and prefixed with the protocol;
    /// for ssh both `user@host:path` and `ssh://user@host/path` are accepted
    #[serde(alias = "repositoryURL")]
    pub repository_url: String,
    /// Branch cloned, committed to and pushed
    pub branch: String,
    /// Username for basic auth, or the ssh user when the URL does not carry one
    #[serde(default)]
    pub username: Option<String>,
    /// Password for basic auth, or the private key passphrase for ssh
    #[serde(default)]
    pub password: Option<String>,
    /// Private key file used for ssh authentication
    #[serde(default)]
    pub ssh_private_key_path: Option<String>,
    /// Parent directory of the local working copy
    pub repository_path: String,
    /// Directory name of the local working copy under `repositoryPath`
    pub repository_folder: String,
    /// Commit locally but never push
    #[serde(default)]
    pub dry_run: bool,
}

impl GitConfigSpec {
    /// Location of the local working copy
    pub fn local_path(&self) -> PathBuf {
        PathBuf::from(&self.repository_path).join(&self.repository_folder)
    }

    /// URL handed to the git transport
    ///
    /// Scheme-less http(s) locations get the protocol prepended. Anything that
    /// already carries a scheme, and every ssh location, is used as written.
    pub fn remote_url(&self) -> String {
        let url = self.repository_url.trim();
        match self.protocol {
            GitProtocol::Http | GitProtocol::Https if !url.contains("://") => {
                format!("{}://{}", self.protocol, url)
            }
            _ => url.to_string(),
        }
    }
}

impl std::fmt::Debug for GitConfigSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitConfigSpec")
            .field("protocol", &self.protocol)
            .field("repository_url", &self.repository_url)
            .field("branch", &self.branch)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("ssh_private_key_path", &self.ssh_private_key_path)
            .field("repository_path", &self.repository_path)
            .field("repository_folder", &self.repository_folder)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

/// Git transport protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum GitProtocol {
    Http,
    Https,
    Ssh,
}

impl std::fmt::Display for GitProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http => f.write_str("http"),
            Self::Https => f.write_str("https"),
            Self::Ssh => f.write_str("ssh"),
        }
    }
}
