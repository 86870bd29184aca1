use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// List declared environments
    #[command(visible_alias = "ls")]
    List,

    /// Show resolved environments
    Show {
        /// Environments to show (default: envlist)
        #[arg(short = 'e', long = "env", value_delimiter = ',')]
        environments: Vec<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Resolve every environment and report problems
    Check,

    /// Run the commands of the selected environments
    Run {
        /// Environments to run (default: envlist)
        #[arg(short = 'e', long = "env", value_delimiter = ',')]
        environments: Vec<String>,

        /// Print what would run without executing anything
        #[arg(long)]
        dry_run: bool,

        /// Arguments substituted for {posargs}
        #[arg(last = true)]
        posargs: Vec<String>,
    },
}
