use async_trait::async_trait;
use envmatrix_core::types::{CommandArguments, EnvironmentVariables};
use envmatrix_core::{Error, Result};
#[cfg(test)]
use std::collections::HashMap;
use std::path::Path;
use std::process::{Output, Stdio};

/// Trait for executing external commands
///
/// The runner only talks to this seam, so tests can substitute canned
/// responses for real processes.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Execute `cmd` in `cwd` with exactly the variables in `env`
    async fn execute_with_env(
        &self,
        cmd: &str,
        args: &CommandArguments,
        env: EnvironmentVariables,
        cwd: &Path,
    ) -> Result<Output>;
}

/// Executes real processes with `tokio::process`
pub struct SystemCommandExecutor {
    /// Collect stdout and stderr instead of passing them through
    pub capture_output: bool,
}

impl SystemCommandExecutor {
    /// Executor whose children write straight to the terminal
    pub fn new() -> Self {
        Self {
            capture_output: false,
        }
    }

    /// Executor that collects child output into the returned [`Output`]
    pub fn capturing() -> Self {
        Self {
            capture_output: true,
        }
    }
}

impl Default for SystemCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandExecutor for SystemCommandExecutor {
    async fn execute_with_env(
        &self,
        cmd: &str,
        args: &CommandArguments,
        env: EnvironmentVariables,
        cwd: &Path,
    ) -> Result<Output> {
        let mut command = tokio::process::Command::new(cmd);
        command
            .args(args.as_slice())
            .env_clear()
            .envs(env.into_inner())
            .current_dir(cwd)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let result = if self.capture_output {
            command.output().await
        } else {
            command.status().await.map(|status| Output {
                status,
                stdout: Vec::new(),
                stderr: Vec::new(),
            })
        };

        result.map_err(|e| {
            Error::command_execution(
                cmd,
                args.as_slice().to_vec(),
                format!("failed to execute command: {e}"),
                None,
            )
        })
    }
}

/// A call seen by [`TestCommandExecutor`]
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub cmd: String,
    pub args: Vec<String>,
    pub env: EnvironmentVariables,
    pub cwd: std::path::PathBuf,
}

/// Test implementation that simulates command execution
/// This provides deterministic behavior for testing
#[cfg(test)]
#[derive(Clone, Default)]
pub struct TestCommandExecutor {
    responses: std::sync::Arc<std::sync::Mutex<HashMap<String, TestResponse>>>,
    calls: std::sync::Arc<std::sync::Mutex<Vec<RecordedCall>>>,
}

#[cfg(test)]
#[derive(Clone)]
pub struct TestResponse {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub status_code: i32,
}

#[cfg(test)]
impl TestCommandExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(cmd: &str, args: &[String]) -> String {
        if args.is_empty() {
            cmd.to_string()
        } else {
            format!("{} {}", cmd, args.join(" "))
        }
    }

    pub fn add_response(&self, cmd: &str, args: &[&str], response: TestResponse) {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(Self::key(cmd, &args), response);
        }
    }

    pub fn add_simple_response(&self, cmd: &str, args: &[&str], stdout: &str) {
        self.add_response(
            cmd,
            args,
            TestResponse {
                stdout: stdout.as_bytes().to_vec(),
                stderr: Vec::new(),
                status_code: 0,
            },
        );
    }

    pub fn add_error_response(&self, cmd: &str, args: &[&str], status_code: i32) {
        self.add_response(
            cmd,
            args,
            TestResponse {
                stdout: Vec::new(),
                stderr: b"command failed".to_vec(),
                status_code,
            },
        );
    }

    /// Calls made so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
#[async_trait]
impl CommandExecutor for TestCommandExecutor {
    async fn execute_with_env(
        &self,
        cmd: &str,
        args: &CommandArguments,
        env: EnvironmentVariables,
        cwd: &Path,
    ) -> Result<Output> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                cmd: cmd.to_string(),
                args: args.as_slice().to_vec(),
                env,
                cwd: cwd.to_path_buf(),
            });
        }

        let key = Self::key(cmd, args.as_slice());
        let responses = self.responses.lock().map_err(|e| Error::Configuration {
            message: format!("Failed to lock test responses: {e}"),
        })?;

        match responses.get(&key) {
            Some(response) => Ok(Output {
                status: exit_status::from_code(response.status_code),
                stdout: response.stdout.clone(),
                stderr: response.stderr.clone(),
            }),
            None => Err(Error::command_execution(
                cmd,
                args.as_slice().to_vec(),
                format!("no test response configured for command: {key}"),
                None,
            )),
        }
    }
}

/// Factory for creating command executors
pub struct CommandExecutorFactory;

impl CommandExecutorFactory {
    /// Production executor with inherited stdio
    pub fn system() -> Box<dyn CommandExecutor> {
        Box::new(SystemCommandExecutor::new())
    }

    /// Production executor that captures output
    pub fn capturing() -> Box<dyn CommandExecutor> {
        Box::new(SystemCommandExecutor::capturing())
    }

    /// Create a test command executor
    #[cfg(test)]
    pub fn test() -> TestCommandExecutor {
        TestCommandExecutor::new()
    }
}
