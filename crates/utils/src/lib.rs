//! Shared utilities for envmatrix
//!
//! Logging setup and path helpers used by the config loader, the runner
//! and the command line front end.

pub mod paths;
pub mod tracing;

pub use paths::*;
