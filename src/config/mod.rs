//! # Configuration
//!
//! Process-level settings. Tenant and git target configuration lives in
//! [`crate::catalog`]; this module only covers how the exporter itself runs.

mod controller;

pub use controller::{ControllerConfig, LogFormat};
