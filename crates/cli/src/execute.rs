use crate::commands::Commands;
use crate::formatters;
use envmatrix_config::{Config, ConfigLoader};
use envmatrix_task::{CommandExecutorFactory, Runner};
use eyre::WrapErr;
use std::path::PathBuf;
use std::process::ExitCode;

/// Options shared by every subcommand
pub struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub verbose: u8,
}

impl Commands {
    pub async fn execute(self, globals: &GlobalArgs) -> eyre::Result<ExitCode> {
        match self {
            Commands::List => {
                let config = load_config(globals, None)?;
                print!("{}", formatters::environment_list(&config, globals.verbose > 0));
                Ok(ExitCode::SUCCESS)
            }

            Commands::Show { environments, json } => {
                let config = load_config(globals, None)?;
                let resolved = select(&config, environments)
                    .iter()
                    .map(|name| config.resolve(name))
                    .collect::<envmatrix_core::Result<Vec<_>>>()?;

                if json {
                    println!("{}", formatters::environments_json(&resolved)?);
                } else {
                    for env in &resolved {
                        print!("{}", formatters::environment_details(env));
                    }
                }
                Ok(ExitCode::SUCCESS)
            }

            Commands::Check => {
                let config = load_config(globals, None)?;
                let problems = config.check();
                if problems.is_empty() {
                    let count = config.environment_names().count();
                    println!("{count} environments OK");
                    return Ok(ExitCode::SUCCESS);
                }
                for problem in &problems {
                    eprintln!("{problem}");
                }
                Ok(ExitCode::FAILURE)
            }

            Commands::Run {
                environments,
                dry_run,
                posargs,
            } => {
                let config = load_config(globals, Some(posargs))?;
                let names = select(&config, environments);
                tracing::info!(environments = ?names, dry_run, "starting run");

                let runner = Runner::new(CommandExecutorFactory::system(), &config).dry_run(dry_run);
                let report = runner.run(&config, &names).await?;

                print!("{}", formatters::run_summary(&report));
                Ok(if report.succeeded() {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                })
            }
        }
    }
}

fn load_config(globals: &GlobalArgs, posargs: Option<Vec<String>>) -> eyre::Result<Config> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &globals.config {
        loader = loader.file(path);
    }
    if let Some(posargs) = posargs {
        loader = loader.posargs(posargs);
    }
    loader.load().wrap_err("failed to load configuration")
}

/// Environments named on the command line, or the defaults
fn select(config: &Config, requested: Vec<String>) -> Vec<String> {
    if requested.is_empty() {
        config.default_environments()
    } else {
        requested
    }
}
