//! # Repository Manager
//!
//! Lifecycle of one git target's working copy during a pass:
//!
//! ```text
//! Uninitialized -> Materialized -> Committed -> Pushed | Skipped
//!        \______________\______________\______> Failed
//! ```
//!
//! Blocking git work runs on tokio's blocking pool; file writes use `tokio::fs`.

use crate::crd::GitConfigSpec;
use crate::error::{ConfigurationError, GitError};
use crate::git::{CommitOutcome, GitAuth, Materialization, PushOutcome, VersionControl};
use crate::observability::metrics;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Where a working copy is in its per-pass lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryState {
    Uninitialized,
    Materialized,
    Committed,
    Pushed,
    /// Push intentionally not performed (dry run)
    Skipped,
    Failed,
}

impl RepositoryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Materialized => "materialized",
            Self::Committed => "committed",
            Self::Pushed => "pushed",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RepositoryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What [`RepositoryManager::push`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushStatus {
    Pushed,
    AlreadyUpToDate,
    /// Dry run: the commit stays local
    SkippedDryRun,
}

/// Working copy of one git target
#[derive(Debug)]
pub struct RepositoryManager {
    backend: Arc<dyn VersionControl>,
    url: String,
    branch: String,
    auth: Arc<GitAuth>,
    local_path: PathBuf,
    dry_run: bool,
    state: RepositoryState,
}

impl RepositoryManager {
    /// Prepare a manager for the `GitConfig` named `name`
    pub fn new(
        backend: Arc<dyn VersionControl>,
        name: &str,
        spec: &GitConfigSpec,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            backend,
            url: spec.remote_url(),
            branch: spec.branch.clone(),
            auth: Arc::new(GitAuth::from_spec(name, spec)?),
            local_path: spec.local_path(),
            dry_run: spec.dry_run,
            state: RepositoryState::Uninitialized,
        })
    }

    pub fn state(&self) -> RepositoryState {
        self.state
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Clone the remote, or open the working copy if it already exists
    pub async fn materialize(&mut self) -> Result<Materialization, GitError> {
        self.expect_state(RepositoryState::Uninitialized, "materialize")?;

        let backend = Arc::clone(&self.backend);
        let auth = Arc::clone(&self.auth);
        let (url, branch, path) = (self.url.clone(), self.branch.clone(), self.local_path.clone());
        let started = Instant::now();
        let result = blocking(move || backend.clone_or_open(&url, &branch, &auth, &path)).await;

        let materialization = self.track("materialize", started, result)?;
        self.state = RepositoryState::Materialized;
        info!(
            path = %self.local_path.display(),
            branch = %self.branch,
            how = ?materialization,
            "Working copy ready"
        );
        Ok(materialization)
    }

    /// Write `contents` to `relative_path` inside the working copy
    ///
    /// Parent directories are created as needed. Absolute paths and paths that
    /// climb out of the working copy are rejected.
    pub async fn write_resource(&self, relative_path: &str, contents: &[u8]) -> Result<PathBuf, GitError> {
        self.expect_state(RepositoryState::Materialized, "write")?;

        let relative = Path::new(relative_path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if relative_path.is_empty() || escapes {
            return Err(GitError::PathEscapesWorkingCopy(relative_path.to_string()));
        }

        let target = self.local_path.join(relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| GitError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&target, contents)
            .await
            .map_err(|source| GitError::Write {
                path: target.clone(),
                source,
            })?;
        debug!(path = %target.display(), bytes = contents.len(), "Wrote resource");
        Ok(target)
    }

    /// Stage the whole working tree and commit it
    pub async fn commit(&mut self, message: &str) -> Result<CommitOutcome, GitError> {
        self.expect_state(RepositoryState::Materialized, "commit")?;

        let backend = Arc::clone(&self.backend);
        let path = self.local_path.clone();
        let message = message.to_string();
        let started = Instant::now();
        let result = blocking(move || {
            backend.stage_all(&path)?;
            backend.commit(&path, &message)
        })
        .await;

        let outcome = self.track("commit", started, result)?;
        self.state = RepositoryState::Committed;
        Ok(outcome)
    }

    /// Push the branch, unless this target is a dry run
    pub async fn push(&mut self) -> Result<PushStatus, GitError> {
        self.expect_state(RepositoryState::Committed, "push")?;

        if self.dry_run {
            self.state = RepositoryState::Skipped;
            return Ok(PushStatus::SkippedDryRun);
        }

        let backend = Arc::clone(&self.backend);
        let auth = Arc::clone(&self.auth);
        let (branch, path) = (self.branch.clone(), self.local_path.clone());
        let started = Instant::now();
        let result = blocking(move || backend.push(&path, &branch, &auth)).await;

        let outcome = self.track("push", started, result)?;
        self.state = RepositoryState::Pushed;
        Ok(match outcome {
            PushOutcome::Pushed => PushStatus::Pushed,
            PushOutcome::AlreadyUpToDate => PushStatus::AlreadyUpToDate,
        })
    }

    fn expect_state(&self, expected: RepositoryState, operation: &'static str) -> Result<(), GitError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(GitError::InvalidState {
                operation,
                state: self.state.as_str(),
            })
        }
    }

    fn track<T>(
        &mut self,
        operation: &str,
        started: Instant,
        result: Result<T, GitError>,
    ) -> Result<T, GitError> {
        metrics::record_git_operation(operation, started.elapsed().as_secs_f64(), result.is_ok());
        if result.is_err() {
            self.state = RepositoryState::Failed;
        }
        result
    }
}

async fn blocking<T, F>(operation: F) -> Result<T, GitError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, GitError> + Send + 'static,
{
    tokio::task::spawn_blocking(operation)
        .await
        .map_err(|e| GitError::Task(e.to_string()))?
}
