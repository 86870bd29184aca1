//! Parsing and resolution of tox-style environment matrices
//!
//! [`parser`] turns INI text into a [`Document`]. [`Config`] declares the
//! environments of a document and resolves each one into a
//! [`ResolvedEnvironment`] with factor-conditional lines filtered and
//! placeholders substituted. [`ConfigLoader`] finds and reads the file.

pub mod config;
pub mod dependency;
pub mod loader;
pub mod matrix;
pub mod parser;
pub mod resolve;
pub mod substitution;

#[cfg(test)]
mod config_tests;

pub use config::{parse_bool, Config, ConfigContext, GlobalSettings, Problem};
pub use dependency::DependencySpec;
pub use loader::ConfigLoader;
pub use parser::{Document, Entry, Section};
pub use resolve::{CommandLine, ResolvedEnvironment};
