//! Sequential environment runner

use crate::command_executor::CommandExecutor;
use crate::environment::{child_environment, find_program, is_allowlisted};
use envmatrix_config::{CommandLine, Config, ResolvedEnvironment};
use envmatrix_core::{CommandArguments, EnvironmentVariables, Error, Result};
use envmatrix_utils::tracing::environment_span;
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Result of one command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutcome {
    pub command: CommandLine,
    /// `None` when the command did not run or was killed by a signal
    pub exit_code: Option<i32>,
    /// Why the command could not be started
    pub error: Option<String>,
}

impl CommandOutcome {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EnvStatus {
    Succeeded,
    Failed,
    /// Failed, but `ignore_outcome` is set
    IgnoredFailure,
    Skipped { reason: String },
    /// Dry run: nothing was executed
    Planned,
    /// The environment could not be resolved or prepared
    Errored { message: String },
}

impl EnvStatus {
    /// Whether this status fails the overall run
    pub fn is_failure(&self) -> bool {
        matches!(self, EnvStatus::Failed | EnvStatus::Errored { .. })
    }
}

/// Report for one environment
#[derive(Debug, Clone, Serialize)]
pub struct EnvReport {
    pub name: String,
    pub status: EnvStatus,
    pub commands: Vec<CommandOutcome>,
    pub duration: Duration,
}

/// Report for a whole run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub environments: Vec<EnvReport>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        !self.environments.iter().any(|e| e.status.is_failure())
    }

    pub fn failed(&self) -> impl Iterator<Item = &EnvReport> {
        self.environments.iter().filter(|e| e.status.is_failure())
    }
}

/// Runs resolved environments through a [`CommandExecutor`]
pub struct Runner {
    executor: Box<dyn CommandExecutor>,
    host_env: EnvironmentVariables,
    work_dir: PathBuf,
    skip_missing_interpreters: bool,
    dry_run: bool,
}

impl Runner {
    /// Runner using the host environment and settings of `config`
    pub fn new(executor: Box<dyn CommandExecutor>, config: &Config) -> Self {
        Self {
            executor,
            host_env: config.context().host_env.clone(),
            work_dir: config.global().toxworkdir.clone(),
            skip_missing_interpreters: config.global().skip_missing_interpreters,
            dry_run: false,
        }
    }

    /// Report the plan without executing anything
    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn skip_missing_interpreters(mut self, skip: bool) -> Self {
        self.skip_missing_interpreters = skip;
        self
    }

    /// Resolve and run `names` one after another
    ///
    /// Every name must be declared. A failing environment does not stop the
    /// ones after it.
    pub async fn run(&self, config: &Config, names: &[String]) -> Result<RunReport> {
        if let Some(unknown) = names.iter().find(|n| !config.is_declared(n)) {
            return Err(Error::unknown_environment(
                unknown.as_str(),
                config.environment_names().map(String::from).collect(),
            ));
        }

        let mut report = RunReport::default();
        for name in names {
            let started = Instant::now();
            let result = match config.resolve(name) {
                Ok(env) => self.run_environment(&env).await,
                Err(e) => Err(e),
            };

            let env_report = result.unwrap_or_else(|e| {
                tracing::error!(environment = %name, error = %e, "environment errored");
                EnvReport {
                    name: name.clone(),
                    status: EnvStatus::Errored {
                        message: e.to_string(),
                    },
                    commands: Vec::new(),
                    duration: started.elapsed(),
                }
            });
            report.environments.push(env_report);
        }

        Ok(report)
    }

    /// Run the commands of one environment in order
    pub async fn run_environment(&self, env: &ResolvedEnvironment) -> Result<EnvReport> {
        let span = environment_span(env.name.as_str());
        self.run_environment_inner(env).instrument(span).await
    }

    async fn run_environment_inner(&self, env: &ResolvedEnvironment) -> Result<EnvReport> {
        let started = Instant::now();
        let name = env.name.to_string();

        if env.commands.is_empty() {
            return Err(Error::validation(&name, "no commands configured"));
        }

        let vars = child_environment(env, &self.host_env, &self.work_dir)?;

        if self.dry_run {
            tracing::info!(commands = env.commands.len(), "planned");
            return Ok(EnvReport {
                name,
                status: EnvStatus::Planned,
                commands: env
                    .commands
                    .iter()
                    .map(|command| CommandOutcome {
                        command: command.clone(),
                        exit_code: None,
                        error: None,
                    })
                    .collect(),
                duration: started.elapsed(),
            });
        }

        if let Some(interpreter) = &env.basepython {
            if find_program(interpreter, &vars, &env.changedir).is_none() {
                if !self.skip_missing_interpreters {
                    return Err(Error::missing_interpreter(&name, interpreter));
                }
                tracing::warn!(interpreter = %interpreter, "interpreter not found, skipping");
                return Ok(EnvReport {
                    name,
                    status: EnvStatus::Skipped {
                        reason: format!("interpreter '{interpreter}' not found"),
                    },
                    commands: Vec::new(),
                    duration: started.elapsed(),
                });
            }
        }

        let mut outcomes = Vec::with_capacity(env.commands.len());
        let mut failed = false;

        for command in &env.commands {
            let outcome = self.run_command(env, command, &vars).await;
            let succeeded = outcome.succeeded();
            outcomes.push(outcome);

            if succeeded {
                continue;
            }
            if command.ignore_exit {
                tracing::info!(command = %command.raw, "ignoring non-zero exit");
                continue;
            }
            failed = true;
            if !env.ignore_errors {
                break;
            }
        }

        let status = match (failed, env.ignore_outcome) {
            (false, _) => EnvStatus::Succeeded,
            (true, true) => EnvStatus::IgnoredFailure,
            (true, false) => EnvStatus::Failed,
        };
        tracing::info!(status = ?status, "environment finished");

        Ok(EnvReport {
            name,
            status,
            commands: outcomes,
            duration: started.elapsed(),
        })
    }

    async fn run_command(
        &self,
        env: &ResolvedEnvironment,
        command: &CommandLine,
        vars: &EnvironmentVariables,
    ) -> CommandOutcome {
        let program = command.program();
        if !is_allowlisted(program, &env.allowlist_externals)
            && find_program(program, vars, &env.changedir).is_none()
        {
            tracing::warn!(
                program = %program,
                "command is not allowlisted and was not found on PATH"
            );
        }

        tracing::info!(command = %command.raw, cwd = %env.changedir.display(), "running");
        let args = CommandArguments::from(command.args());

        match self
            .executor
            .execute_with_env(program, &args, vars.clone(), &env.changedir)
            .await
        {
            Ok(output) => {
                let exit_code = output.status.code();
                if !output.status.success() {
                    tracing::warn!(command = %command.raw, exit_code = ?exit_code, "command failed");
                }
                CommandOutcome {
                    command: command.clone(),
                    exit_code,
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(command = %command.raw, error = %e, "command could not be started");
                CommandOutcome {
                    command: command.clone(),
                    exit_code: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_executor::TestCommandExecutor;
    use envmatrix_config::ConfigContext;
    use envmatrix_core::{ENV_NAME_VAR, ENV_DIR_VAR};

    fn config(text: &str) -> Config {
        let mut host_env = EnvironmentVariables::new();
        host_env.insert("PATH", "/nonexistent");
        host_env.insert("SECRET", "x");
        Config::parse(text, ConfigContext::new("/src/project").with_host_env(host_env)).unwrap()
    }

    fn runner(executor: &TestCommandExecutor, config: &Config) -> Runner {
        Runner::new(Box::new(executor.clone()), config)
    }

    #[tokio::test]
    async fn test_commands_run_in_order() {
        let config = config(
            "[testenv:docs]\nchangedir = doc\ncommands =\n    make html\n    make doctest\n",
        );
        let executor = TestCommandExecutor::new();
        executor.add_simple_response("make", &["html"], "");
        executor.add_simple_response("make", &["doctest"], "");

        let env = config.resolve("docs").unwrap();
        let report = runner(&executor, &config).run_environment(&env).await.unwrap();

        assert_eq!(report.status, EnvStatus::Succeeded);
        assert_eq!(report.commands.len(), 2);
        assert!(report.commands.iter().all(CommandOutcome::succeeded));

        let calls = executor.calls();
        let argv: Vec<String> = calls.iter().map(|c| c.args.join(" ")).collect();
        assert_eq!(argv, vec!["html", "doctest"]);
        assert_eq!(calls[0].cwd, PathBuf::from("/src/project/doc"));
        assert_eq!(calls[0].env.get(ENV_NAME_VAR).map(String::as_str), Some("docs"));
        assert_eq!(
            calls[0].env.get(ENV_DIR_VAR).map(String::as_str),
            Some("/src/project/.tox/docs")
        );
        assert!(!calls[0].env.contains_key("SECRET"));
    }

    #[tokio::test]
    async fn test_first_failure_stops_environment() {
        let config = config("[testenv:lint]\ncommands =\n    flake8 src\n    mypy src\n");
        let executor = TestCommandExecutor::new();
        executor.add_error_response("flake8", &["src"], 2);
        executor.add_simple_response("mypy", &["src"], "");

        let env = config.resolve("lint").unwrap();
        let report = runner(&executor, &config).run_environment(&env).await.unwrap();

        assert_eq!(report.status, EnvStatus::Failed);
        assert_eq!(report.commands.len(), 1);
        assert_eq!(report.commands[0].exit_code, Some(2));
        assert_eq!(executor.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_dash_prefixed_command_failure_is_ignored() {
        let config = config("[testenv:cov]\ncommands =\n    - coverage erase\n    coverage report\n");
        let executor = TestCommandExecutor::new();
        executor.add_error_response("coverage", &["erase"], 1);
        executor.add_simple_response("coverage", &["report"], "");

        let env = config.resolve("cov").unwrap();
        let report = runner(&executor, &config).run_environment(&env).await.unwrap();

        assert_eq!(report.status, EnvStatus::Succeeded);
        assert_eq!(report.commands.len(), 2);
        assert_eq!(report.commands[0].exit_code, Some(1));
    }

    #[tokio::test]
    async fn test_ignore_errors_continues_but_fails() {
        let config = config(
            "[testenv:lint]\nignore_errors = true\ncommands =\n    flake8 src\n    mypy src\n",
        );
        let executor = TestCommandExecutor::new();
        executor.add_error_response("flake8", &["src"], 1);
        executor.add_simple_response("mypy", &["src"], "");

        let env = config.resolve("lint").unwrap();
        let report = runner(&executor, &config).run_environment(&env).await.unwrap();

        assert_eq!(report.status, EnvStatus::Failed);
        assert_eq!(report.commands.len(), 2);
    }

    #[tokio::test]
    async fn test_ignore_outcome_marks_ignored_failure() {
        let config = config("[testenv:nightly]\nignore_outcome = yes\ncommands = pytest\n");
        let executor = TestCommandExecutor::new();
        executor.add_error_response("pytest", &[], 1);

        let env = config.resolve("nightly").unwrap();
        let report = runner(&executor, &config).run_environment(&env).await.unwrap();

        assert_eq!(report.status, EnvStatus::IgnoredFailure);
        assert!(!report.status.is_failure());
    }

    #[tokio::test]
    async fn test_unstartable_command_fails_environment() {
        let config = config("[testenv:a]\ncommands = missing-tool --version\n");
        let executor = TestCommandExecutor::new();

        let env = config.resolve("a").unwrap();
        let report = runner(&executor, &config).run_environment(&env).await.unwrap();

        assert_eq!(report.status, EnvStatus::Failed);
        assert!(report.commands[0].error.is_some());
    }

    #[tokio::test]
    async fn test_empty_commands_are_refused() {
        let config = config("[testenv:a]\ndeps = lxml\n");
        let env = config.resolve("a").unwrap();
        let err = runner(&TestCommandExecutor::new(), &config)
            .run_environment(&env)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[tokio::test]
    async fn test_missing_interpreter() {
        let config = config("[testenv:py38]\ncommands = python -m unittest\n");
        let env = config.resolve("py38").unwrap();
        let executor = TestCommandExecutor::new();

        let err = runner(&executor, &config)
            .run_environment(&env)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingInterpreter { .. }));

        let report = runner(&executor, &config)
            .skip_missing_interpreters(true)
            .run_environment(&env)
            .await
            .unwrap();
        assert!(matches!(report.status, EnvStatus::Skipped { .. }));
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_executes_nothing() {
        let config = config("[testenv:py38]\ncommands =\n    pytest\n    coverage report\n");
        let executor = TestCommandExecutor::new();

        let env = config.resolve("py38").unwrap();
        let report = runner(&executor, &config)
            .dry_run(true)
            .run_environment(&env)
            .await
            .unwrap();

        assert_eq!(report.status, EnvStatus::Planned);
        assert_eq!(report.commands.len(), 2);
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_run_continues_after_failed_environment() {
        let config = config(
            "[tox]\nenvlist = lint, docs, empty\n\n[testenv:lint]\ncommands = flake8\n\n[testenv:docs]\ncommands = make html\n",
        );
        let executor = TestCommandExecutor::new();
        executor.add_error_response("flake8", &[], 1);
        executor.add_simple_response("make", &["html"], "");

        let report = runner(&executor, &config)
            .run(&config, &config.default_environments())
            .await
            .unwrap();

        let statuses: Vec<&EnvStatus> = report.environments.iter().map(|e| &e.status).collect();
        assert_eq!(statuses[0], &EnvStatus::Failed);
        assert_eq!(statuses[1], &EnvStatus::Succeeded);
        assert!(matches!(statuses[2], EnvStatus::Errored { .. }));
        assert!(!report.succeeded());
        assert_eq!(report.failed().count(), 2);
    }

    #[tokio::test]
    async fn test_run_rejects_unknown_environment_before_running() {
        let config = config("[testenv:docs]\ncommands = make html\n");
        let executor = TestCommandExecutor::new();

        let err = runner(&executor, &config)
            .run(&config, &["docs".to_string(), "py27".to_string()])
            .await
            .unwrap_err();
        assert!(err.is_unknown_environment());
        assert!(executor.calls().is_empty());
    }
}
