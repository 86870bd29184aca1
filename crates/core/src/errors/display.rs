//! Display implementations for error types

use super::types::Error;
use std::fmt;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse {
                path,
                line,
                message,
            } => match path {
                Some(path) => write!(f, "{}:{line}: parse error: {message}", path.display()),
                None => write!(f, "line {line}: parse error: {message}"),
            },
            Error::UnknownEnvironment { name, available } => {
                if available.is_empty() {
                    write!(f, "unknown environment '{name}' (no environments declared)")
                } else {
                    write!(
                        f,
                        "unknown environment '{name}', expected one of: {}",
                        available.join(", ")
                    )
                }
            }
            Error::DependencyConflict {
                environment,
                package,
                first,
                second,
            } => {
                write!(
                    f,
                    "environment '{environment}' pins '{package}' twice: '{first}' conflicts with '{second}'"
                )
            }
            Error::Substitution { value, message } => {
                write!(f, "failed to substitute '{value}': {message}")
            }
            Error::InvalidValue {
                key,
                value,
                message,
            } => {
                write!(f, "invalid value '{value}' for '{key}': {message}")
            }
            Error::InvalidCommand {
                environment,
                command,
                message,
            } => {
                write!(
                    f,
                    "invalid command '{command}' in environment '{environment}': {message}"
                )
            }
            Error::Validation {
                environment,
                message,
            } => {
                write!(f, "environment '{environment}' is not runnable: {message}")
            }
            Error::MissingInterpreter {
                environment,
                interpreter,
            } => {
                write!(
                    f,
                    "interpreter '{interpreter}' for environment '{environment}' not found"
                )
            }
            Error::CommandExecution {
                command,
                args,
                message,
                exit_code,
            } => {
                let args_str = args.join(" ");
                let invocation = if args_str.is_empty() {
                    command.clone()
                } else {
                    format!("{command} {args_str}")
                };
                match exit_code {
                    Some(code) => write!(
                        f,
                        "command '{invocation}' failed with exit code {code}: {message}"
                    ),
                    None => write!(f, "command '{invocation}' failed: {message}"),
                }
            }
            Error::Configuration { message } => {
                write!(f, "configuration error: {message}")
            }
            Error::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "file system {} operation failed for '{}': {}",
                    operation,
                    path.display(),
                    source
                )
            }
            Error::Json { message, .. } => {
                write!(f, "JSON error: {message}")
            }
        }
    }
}
