use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod execute;
mod formatters;

use commands::Commands;

#[derive(Parser)]
#[command(name = "envmatrix")]
#[command(about = "Inspect and run tox-style test environment matrices", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the nearest tox.ini)
    #[arg(short = 'c', long = "config", env = "ENVMATRIX_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Raise the log level; also shows descriptions in `list`
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> eyre::Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();

    envmatrix_utils::tracing::init(cli.verbose)
        .map_err(|e| eyre::eyre!("failed to initialize logging: {e}"))?;

    let globals = execute::GlobalArgs {
        config: cli.config,
        verbose: cli.verbose,
    };
    cli.command.execute(&globals).await
}
