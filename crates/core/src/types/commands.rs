//! Command-related types for command execution

use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// Type-safe wrapper for command arguments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandArguments(Vec<String>);

impl CommandArguments {
    /// Create new empty arguments
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Get a slice of the arguments
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl Deref for CommandArguments {
    type Target = Vec<String>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<String>> for CommandArguments {
    fn from(args: Vec<String>) -> Self {
        Self(args)
    }
}

impl From<&[String]> for CommandArguments {
    fn from(args: &[String]) -> Self {
        Self(args.to_vec())
    }
}
