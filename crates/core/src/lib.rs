//! Core domain types, errors, and constants for `envmatrix`.
//!
//! ## Key Components
//!
//! - **`errors`**: the `Error` enum and `Result` alias shared by every crate
//!   in the workspace.
//! - **`types`**: newtype wrappers such as `EnvironmentVariables` and
//!   `CommandArguments`.
//! - **`constants`**: file names, section names and environment variable
//!   names.

pub mod constants;
pub mod errors;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, Result},
    types::*,
};
