//! # Custom Resource Definitions
//!
//! Configuration resources consumed by the exporter.
//!
//! ## Module Structure
//!
//! - `export.rs` - `ExportConfig`: tenant selection of resources and the git target it writes to
//! - `git.rs` - `GitConfig`: remote repository, branch, credentials and local working copy
//! - `filter.rs` - `ResourceFilter` entries shared by include and exclude lists

mod export;
mod filter;
mod git;

pub use export::{ExportConfig, ExportConfigSpec, OutputType};
pub use filter::ResourceFilter;
pub use git::{GitConfig, GitConfigSpec, GitProtocol};
