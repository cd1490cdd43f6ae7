//! # Version Control Backend
//!
//! Blocking git operations behind the [`VersionControl`] trait. [`Git2Backend`]
//! implements them with libgit2; the repository manager runs them on the
//! blocking pool.

use crate::constants::DEFAULT_REMOTE_NAME;
use crate::error::GitError;
use crate::git::GitAuth;
use git2::{
    build::RepoBuilder, Direction, ErrorCode, FetchOptions, IndexAddOption, Oid, PushOptions,
    Remote, RemoteCallbacks, Repository, Signature,
};
use std::cell::{Cell, RefCell};
use std::path::Path;
use tracing::debug;

/// How a working copy came into existence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Materialization {
    /// Cloned from the remote during this pass
    Cloned,
    /// Already present on disk and opened as-is
    Opened,
}

/// Result of a commit attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A new commit with this id
    Created(String),
    /// The staged tree equals the current head; no commit was made
    NothingToCommit,
}

/// Result of a push attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Pushed,
    /// The remote already has the local head
    AlreadyUpToDate,
}

/// Git operations needed by a synchronization pass
pub trait VersionControl: Send + Sync + std::fmt::Debug {
    /// Clone `url` at `branch` into `local_path`, or open it if it already exists
    fn clone_or_open(
        &self,
        url: &str,
        branch: &str,
        auth: &GitAuth,
        local_path: &Path,
    ) -> Result<Materialization, GitError>;

    /// Stage every addition, modification and deletion in the working tree
    fn stage_all(&self, local_path: &Path) -> Result<(), GitError>;

    /// Commit the index on the current branch
    fn commit(&self, local_path: &Path, message: &str) -> Result<CommitOutcome, GitError>;

    /// Push `branch` to the origin remote
    fn push(&self, local_path: &Path, branch: &str, auth: &GitAuth) -> Result<PushOutcome, GitError>;
}

/// libgit2 implementation of [`VersionControl`]
#[derive(Debug, Clone)]
pub struct Git2Backend {
    author_name: String,
    author_email: String,
}

impl Git2Backend {
    pub fn new(author_name: impl Into<String>, author_email: impl Into<String>) -> Self {
        Self {
            author_name: author_name.into(),
            author_email: author_email.into(),
        }
    }

    fn signature(&self) -> Result<Signature<'static>, GitError> {
        Ok(Signature::now(&self.author_name, &self.author_email)?)
    }
}

impl VersionControl for Git2Backend {
    fn clone_or_open(
        &self,
        url: &str,
        branch: &str,
        auth: &GitAuth,
        local_path: &Path,
    ) -> Result<Materialization, GitError> {
        if local_path.exists() {
            Repository::open(local_path)?;
            debug!(path = %local_path.display(), "Opened existing working copy");
            return Ok(Materialization::Opened);
        }

        if let Some(parent) = local_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| GitError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let attempts = Cell::new(0);
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(|_url, username, allowed| auth.credentials(&attempts, username, allowed));
        let mut fetch = FetchOptions::new();
        fetch.remote_callbacks(callbacks);

        RepoBuilder::new()
            .branch(branch)
            .fetch_options(fetch)
            .clone(url, local_path)?;
        debug!(path = %local_path.display(), branch = branch, "Cloned working copy");
        Ok(Materialization::Cloned)
    }

    fn stage_all(&self, local_path: &Path) -> Result<(), GitError> {
        let repo = Repository::open(local_path)?;
        let mut index = repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"].iter(), None)?;
        index.write()?;
        Ok(())
    }

    fn commit(&self, local_path: &Path, message: &str) -> Result<CommitOutcome, GitError> {
        let repo = Repository::open(local_path)?;
        let mut index = repo.index()?;
        let tree_id = index.write_tree()?;

        let parent = match repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => None,
            Err(e) => return Err(e.into()),
        };
        let unchanged = match &parent {
            Some(parent) => parent.tree_id() == tree_id,
            None => index.is_empty(),
        };
        if unchanged {
            return Ok(CommitOutcome::NothingToCommit);
        }

        let tree = repo.find_tree(tree_id)?;
        let signature = self.signature()?;
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        let oid = repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        Ok(CommitOutcome::Created(oid.to_string()))
    }

    fn push(&self, local_path: &Path, branch: &str, auth: &GitAuth) -> Result<PushOutcome, GitError> {
        let repo = Repository::open(local_path)?;
        let local_ref = format!("refs/heads/{branch}");
        let local_oid = match repo.refname_to_id(&local_ref) {
            Ok(oid) => oid,
            Err(e) if e.code() == ErrorCode::NotFound => {
                return Err(GitError::EmptyBranch(branch.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let tracking_ref = format!("refs/remotes/{DEFAULT_REMOTE_NAME}/{branch}");
        let mut remote = repo.find_remote(DEFAULT_REMOTE_NAME)?;
        if remote_head(&mut remote, &local_ref, auth)? == Some(local_oid) {
            repo.reference(&tracking_ref, local_oid, true, "push: remote already up to date")?;
            debug!(branch = branch, "Remote branch already at local head");
            return Ok(PushOutcome::AlreadyUpToDate);
        }

        let rejection: RefCell<Option<(String, String)>> = RefCell::new(None);
        let attempts = Cell::new(0);
        {
            let mut callbacks = RemoteCallbacks::new();
            callbacks.credentials(|_url, username, allowed| auth.credentials(&attempts, username, allowed));
            callbacks.push_update_reference(|refname, status| {
                if let Some(message) = status {
                    *rejection.borrow_mut() = Some((refname.to_string(), message.to_string()));
                }
                Ok(())
            });
            let mut options = PushOptions::new();
            options.remote_callbacks(callbacks);
            let refspec = format!("{local_ref}:{local_ref}");
            remote.push(&[refspec.as_str()], Some(&mut options))?;
        }

        if let Some((refname, message)) = rejection.into_inner() {
            return Err(GitError::PushRejected { refname, message });
        }

        repo.reference(&tracking_ref, local_oid, true, "push: update tracking reference")?;
        Ok(PushOutcome::Pushed)
    }
}

/// Current id of `refname` on the remote, `None` when the remote lacks it
fn remote_head(remote: &mut Remote<'_>, refname: &str, auth: &GitAuth) -> Result<Option<Oid>, GitError> {
    let attempts = Cell::new(0);
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(|_url, username, allowed| auth.credentials(&attempts, username, allowed));
    let connection = remote.connect_auth(Direction::Push, Some(callbacks), None)?;
    let head = connection
        .list()?
        .iter()
        .find(|head| head.name() == refname)
        .map(|head| head.oid());
    Ok(head)
}
