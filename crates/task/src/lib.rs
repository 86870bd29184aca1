//! Running resolved environments
//!
//! [`Runner`] executes the commands of each environment in order through a
//! [`CommandExecutor`], stopping an environment at its first failing command.

pub mod command_executor;
pub mod environment;
pub mod runner;

pub use command_executor::{CommandExecutor, CommandExecutorFactory, SystemCommandExecutor};
pub use runner::{CommandOutcome, EnvReport, EnvStatus, RunReport, Runner};
