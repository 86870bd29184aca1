//! Core domain types shared across the workspace.
//!
//! - **`commands`**: argument lists handed to the command executor
//! - **`environment`**: environment variables and environment names

pub mod commands;
pub mod environment;

pub use commands::*;
pub use environment::*;
