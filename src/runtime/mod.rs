//! # Runtime
//!
//! Process bootstrap and the top-level run loop.

mod initialization;

pub use initialization::{init_tracing, initialize, run, InitializationResult};
