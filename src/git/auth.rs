//! # Git Credentials
//!
//! Credentials derived from a `GitConfig` and handed to the git transport.
//! Secrets are zeroized when the value is dropped.

use crate::constants::MAX_CREDENTIAL_ATTEMPTS;
use crate::crd::{GitConfigSpec, GitProtocol};
use crate::error::ConfigurationError;
use git2::{Cred, CredentialType};
use std::cell::Cell;
use std::path::PathBuf;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// User assumed for ssh when neither the config nor the URL names one
const DEFAULT_SSH_USER: &str = "git";

/// Authentication for one git target
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub enum GitAuth {
    /// Username and password (or token) over http(s)
    Basic { username: String, password: String },
    /// Private key file, optionally protected by a passphrase
    SshKey {
        username: String,
        #[zeroize(skip)]
        private_key: PathBuf,
        passphrase: Option<String>,
    },
}

impl std::fmt::Debug for GitAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::SshKey {
                username,
                private_key,
                passphrase,
            } => f
                .debug_struct("SshKey")
                .field("username", username)
                .field("private_key", private_key)
                .field("passphrase", &passphrase.as_ref().map(|_| "<redacted>"))
                .finish(),
        }
    }
}

impl GitAuth {
    /// Build credentials for `spec`
    ///
    /// For ssh the username is, in order: the configured username, the user part
    /// of the repository URL, then `git`. The configured password doubles as the
    /// key passphrase.
    pub fn from_spec(name: &str, spec: &GitConfigSpec) -> Result<Self, ConfigurationError> {
        let non_empty = |value: &Option<String>| value.as_deref().filter(|v| !v.is_empty()).map(str::to_string);
        match spec.protocol {
            GitProtocol::Ssh => {
                let private_key = non_empty(&spec.ssh_private_key_path).ok_or_else(|| {
                    ConfigurationError::InvalidField {
                        kind: "GitConfig",
                        name: name.to_string(),
                        field: "sshPrivateKeyPath",
                        reason: "is required for the ssh protocol".to_string(),
                    }
                })?;
                let username = non_empty(&spec.username)
                    .or_else(|| ssh_username_from_url(&spec.repository_url).map(str::to_string))
                    .unwrap_or_else(|| DEFAULT_SSH_USER.to_string());
                Ok(Self::SshKey {
                    username,
                    private_key: PathBuf::from(private_key),
                    passphrase: non_empty(&spec.password),
                })
            }
            GitProtocol::Http | GitProtocol::Https => Ok(Self::Basic {
                username: non_empty(&spec.username).unwrap_or_default(),
                password: non_empty(&spec.password).unwrap_or_default(),
            }),
        }
    }

    pub fn username(&self) -> &str {
        match self {
            Self::Basic { username, .. } | Self::SshKey { username, .. } => username,
        }
    }

    /// Answer one credential request from libgit2
    ///
    /// `attempts` counts invocations for the current operation; libgit2 keeps
    /// asking while credentials are rejected, so the caller bounds the loop.
    pub(crate) fn credentials(
        &self,
        attempts: &Cell<usize>,
        username_from_url: Option<&str>,
        allowed: CredentialType,
    ) -> Result<Cred, git2::Error> {
        let attempt = attempts.get() + 1;
        attempts.set(attempt);
        if attempt > MAX_CREDENTIAL_ATTEMPTS {
            return Err(git2::Error::from_str(
                "authentication failed: credentials rejected by remote",
            ));
        }

        match self {
            Self::Basic { username, password } => {
                if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
                    let user = if username.is_empty() {
                        username_from_url.unwrap_or_default()
                    } else {
                        username
                    };
                    Cred::userpass_plaintext(user, password)
                } else {
                    Cred::default()
                }
            }
            Self::SshKey {
                username,
                private_key,
                passphrase,
            } => {
                if allowed.contains(CredentialType::USERNAME) {
                    Cred::username(username)
                } else {
                    Cred::ssh_key(username, None, private_key, passphrase.as_deref())
                }
            }
        }
    }
}

/// User part of an ssh location (`user@host:path` or `ssh://user@host/path`)
pub fn ssh_username_from_url(url: &str) -> Option<&str> {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split('/').next().unwrap_or(rest);
    authority
        .split_once('@')
        .map(|(user, _)| user)
        .filter(|user| !user.is_empty())
}
