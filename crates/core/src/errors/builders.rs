//! Builder methods for creating errors with context

use super::types::Error;
use std::path::PathBuf;

impl Error {
    /// Create a parse error for a line of an in-memory document
    #[must_use]
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            path: None,
            line,
            message: message.into(),
        }
    }

    /// Attach the source file to a parse error; other errors pass through
    #[must_use]
    pub fn with_path(self, path: impl Into<PathBuf>) -> Self {
        match self {
            Error::Parse {
                path: None,
                line,
                message,
            } => Error::Parse {
                path: Some(path.into()),
                line,
                message,
            },
            other => other,
        }
    }

    /// Create an unknown environment error
    #[must_use]
    pub fn unknown_environment(name: impl Into<String>, available: Vec<String>) -> Self {
        Error::UnknownEnvironment {
            name: name.into(),
            available,
        }
    }

    /// Create a dependency conflict error
    #[must_use]
    pub fn dependency_conflict(
        environment: impl Into<String>,
        package: impl Into<String>,
        first: impl Into<String>,
        second: impl Into<String>,
    ) -> Self {
        Error::DependencyConflict {
            environment: environment.into(),
            package: package.into(),
            first: first.into(),
            second: second.into(),
        }
    }

    /// Create a substitution error
    #[must_use]
    pub fn substitution(value: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Substitution {
            value: value.into(),
            message: message.into(),
        }
    }

    /// Create an invalid value error
    #[must_use]
    pub fn invalid_value(
        key: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::InvalidValue {
            key: key.into(),
            value: value.into(),
            message: message.into(),
        }
    }

    /// Create an invalid command error
    #[must_use]
    pub fn invalid_command(
        environment: impl Into<String>,
        command: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::InvalidCommand {
            environment: environment.into(),
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    #[must_use]
    pub fn validation(environment: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            environment: environment.into(),
            message: message.into(),
        }
    }

    /// Create a missing interpreter error
    #[must_use]
    pub fn missing_interpreter(
        environment: impl Into<String>,
        interpreter: impl Into<String>,
    ) -> Self {
        Error::MissingInterpreter {
            environment: environment.into(),
            interpreter: interpreter.into(),
        }
    }

    /// Create a command execution error
    #[must_use]
    pub fn command_execution(
        command: impl Into<String>,
        args: Vec<String>,
        message: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Error::CommandExecution {
            command: command.into(),
            args,
            message: message.into(),
            exit_code,
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a file system error with context
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Whether this error is a lookup failure for an undeclared environment
    #[must_use]
    pub fn is_unknown_environment(&self) -> bool {
        matches!(self, Error::UnknownEnvironment { .. })
    }
}
