//! # Git
//!
//! Working-copy management for git targets.
//!
//! - `auth.rs` - credentials derived from a `GitConfig`
//! - `backend.rs` - blocking libgit2 operations behind [`VersionControl`]
//! - `repository.rs` - per-pass state machine driving the backend

mod auth;
mod backend;
mod repository;

pub use auth::{ssh_username_from_url, GitAuth};
pub use backend::{CommitOutcome, Git2Backend, Materialization, PushOutcome, VersionControl};
pub use repository::{PushStatus, RepositoryManager, RepositoryState};
