//! Configuration loader
//!
//! Finds the configuration file, reads it and builds a [`Config`] with the
//! host facts (environment variables, home directory, positional arguments)
//! that substitution needs.

use crate::config::{Config, ConfigContext};
use crate::parser;
use envmatrix_core::{EnvironmentVariables, Error, Result, CONFIG_FILENAME};
use envmatrix_utils::{absolutize, find_upwards, home_dir};
use std::path::{Path, PathBuf};

/// Configuration loader
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Directory to search from (defaults to the current directory)
    directory: Option<PathBuf>,
    /// Explicit configuration file; disables the upward search
    file: Option<PathBuf>,
    posargs: Option<Vec<String>>,
    host_env: Option<EnvironmentVariables>,
    homedir: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the directory to search from
    pub fn directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.directory = Some(dir.into());
        self
    }

    /// Use this file instead of searching
    pub fn file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Arguments substituted for `{posargs}`
    pub fn posargs(mut self, posargs: Vec<String>) -> Self {
        self.posargs = Some(posargs);
        self
    }

    /// Variables visible to `{env:KEY}` (defaults to the process environment)
    pub fn host_env(mut self, env: EnvironmentVariables) -> Self {
        self.host_env = Some(env);
        self
    }

    /// Directory substituted for `{homedir}`
    pub fn homedir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.homedir = Some(dir.into());
        self
    }

    /// Path of the configuration file that `load` would read
    pub fn locate(&self) -> Result<PathBuf> {
        let start = match &self.directory {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()
                .map_err(|e| Error::file_system(".", "read current directory", e))?,
        };

        match &self.file {
            Some(file) => {
                let mut path = absolutize(&start, file);
                if path.is_dir() {
                    path.push(CONFIG_FILENAME);
                }
                if !path.is_file() {
                    return Err(Error::configuration(format!(
                        "configuration file '{}' does not exist",
                        path.display()
                    )));
                }
                Ok(path)
            }
            None => find_upwards(&start, CONFIG_FILENAME).ok_or_else(|| {
                Error::configuration(format!(
                    "no {CONFIG_FILENAME} found in {} or any parent directory",
                    start.display()
                ))
            }),
        }
    }

    /// Load the configuration
    pub fn load(self) -> Result<Config> {
        let path = self.locate()?;
        tracing::debug!(path = %path.display(), "loading configuration");

        let text = std::fs::read_to_string(&path)
            .map_err(|e| Error::file_system(&path, "read configuration", e))?;
        let document = parser::parse(&text)
            .map_err(|e| e.with_path(&path))?
            .with_source(&path);

        let toxinidir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut context = ConfigContext::new(toxinidir).with_host_env(
            self.host_env
                .unwrap_or_else(EnvironmentVariables::from_process),
        );
        if let Some(homedir) = self.homedir.or_else(|| home_dir().ok()) {
            context = context.with_homedir(homedir);
        }
        if let Some(posargs) = self.posargs {
            context = context.with_posargs(posargs);
        }

        Config::new(document, context).map_err(|e| e.with_path(&path))
    }
}
