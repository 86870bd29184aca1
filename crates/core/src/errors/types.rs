//! Core error type definitions

use std::path::PathBuf;

/// Result type alias for envmatrix operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for envmatrix operations using thiserror
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed configuration syntax
    Parse {
        path: Option<PathBuf>,
        line: usize,
        message: String,
    },

    /// Lookup of an environment that the matrix does not declare
    UnknownEnvironment {
        name: String,
        available: Vec<String>,
    },

    /// Two different version constraints on one package
    DependencyConflict {
        environment: String,
        package: String,
        first: String,
        second: String,
    },

    /// Placeholder substitution errors
    Substitution { value: String, message: String },

    /// A key holds a value of the wrong shape
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },

    /// A command line that cannot be split into words
    InvalidCommand {
        environment: String,
        command: String,
        message: String,
    },

    /// A resolved environment that cannot be run
    Validation {
        environment: String,
        message: String,
    },

    /// The base interpreter is not available on this host
    MissingInterpreter {
        environment: String,
        interpreter: String,
    },

    /// Command execution errors
    CommandExecution {
        command: String,
        args: Vec<String>,
        message: String,
        exit_code: Option<i32>,
    },

    /// Configuration errors
    Configuration { message: String },

    /// File system operations
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization errors
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}
