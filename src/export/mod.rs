//! # Export Pipeline
//!
//! From resource filters to manifest bytes:
//!
//! - `locator.rs` - filter validation, discovery with a mapping cache, namespace expansion
//! - `fetcher.rs` - listing, selector/exclusion matching, stripping, serialization
//! - `paths.rs` - on-disk layout of exported manifests

mod fetcher;
mod locator;
mod paths;

pub use fetcher::{
    is_excluded, matches_selectors, render, serialize, strip_fields, ExportedResource,
    ResourceFetcher,
};
pub use locator::{check_filter, parse_gvk, ResourceLocator};
pub use paths::resource_path;
