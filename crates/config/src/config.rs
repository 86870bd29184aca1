//! The loaded environment matrix

use crate::matrix::{expand_braces, expand_env_list};
use crate::parser::{self, Document};
use crate::resolve::{resolve_environment, ResolvedEnvironment, KNOWN_ENV_KEYS};
use crate::substitution::{SubstitutionContext, Substitutor};
use envmatrix_core::{
    EnvironmentVariables, Error, Result, BASE_ENV_SECTION, DEFAULT_WORK_DIR, ENV_SECTION_PREFIX,
    GLOBAL_SECTION,
};
use envmatrix_utils::absolutize;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

const KNOWN_GLOBAL_KEYS: &[&str] = &[
    "envlist",
    "skip_missing_interpreters",
    "toxworkdir",
    "minversion",
    "skipsdist",
];

/// Host facts that placeholders may refer to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigContext {
    /// Directory containing the configuration file
    pub toxinidir: PathBuf,
    pub homedir: Option<PathBuf>,
    pub host_env: EnvironmentVariables,
    /// Extra arguments given after `--`; `None` when none were given
    pub posargs: Option<Vec<String>>,
}

impl ConfigContext {
    #[must_use]
    pub fn new(toxinidir: impl Into<PathBuf>) -> Self {
        Self {
            toxinidir: toxinidir.into(),
            homedir: None,
            host_env: EnvironmentVariables::new(),
            posargs: None,
        }
    }

    #[must_use]
    pub fn with_homedir(mut self, homedir: impl Into<PathBuf>) -> Self {
        self.homedir = Some(homedir.into());
        self
    }

    #[must_use]
    pub fn with_host_env(mut self, host_env: EnvironmentVariables) -> Self {
        self.host_env = host_env;
        self
    }

    #[must_use]
    pub fn with_posargs(mut self, posargs: Vec<String>) -> Self {
        self.posargs = Some(posargs);
        self
    }
}

/// Settings from the `[tox]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalSettings {
    pub envlist: Vec<String>,
    pub skip_missing_interpreters: bool,
    pub toxworkdir: PathBuf,
    pub minversion: Option<String>,
    pub skipsdist: bool,
}

/// Something `check` found wrong with one environment
#[derive(Debug)]
pub enum Problem {
    /// The environment does not resolve
    Unresolvable { environment: String, error: Error },
    /// The environment resolves but has nothing to run
    NoCommands { environment: String },
}

impl Problem {
    pub fn environment(&self) -> &str {
        match self {
            Problem::Unresolvable { environment, .. } | Problem::NoCommands { environment } => {
                environment
            }
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::Unresolvable { environment, error } => write!(f, "{environment}: {error}"),
            Problem::NoCommands { environment } => {
                write!(f, "{environment}: no commands configured")
            }
        }
    }
}

/// A parsed configuration with its declared environments
///
/// Environments come from `envlist` and from every `[testenv:NAME]` section,
/// with brace groups in section names expanded. Each declared name maps to
/// the section that configures it, if any.
#[derive(Debug, Clone)]
pub struct Config {
    document: Document,
    context: ConfigContext,
    global: GlobalSettings,
    environments: IndexMap<String, Option<String>>,
}

impl Config {
    /// Parse `text` and build the matrix
    pub fn parse(text: &str, context: ConfigContext) -> Result<Self> {
        Self::new(parser::parse(text)?, context)
    }

    /// Build the matrix from an already parsed document
    pub fn new(document: Document, context: ConfigContext) -> Result<Self> {
        let global = read_global(&document, &context)?;
        let environments = declare_environments(&document, &global.envlist)?;
        log_unknown_keys(&document);

        tracing::debug!(
            environments = environments.len(),
            envlist = global.envlist.len(),
            "configuration loaded"
        );

        Ok(Self {
            document,
            context,
            global,
            environments,
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn context(&self) -> &ConfigContext {
        &self.context
    }

    pub fn global(&self) -> &GlobalSettings {
        &self.global
    }

    pub fn toxinidir(&self) -> &Path {
        &self.context.toxinidir
    }

    /// Every declared environment, `envlist` entries first
    pub fn environment_names(&self) -> impl Iterator<Item = &str> {
        self.environments.keys().map(String::as_str)
    }

    /// The environments run when none are selected: `envlist`, or every
    /// declared environment when `envlist` is empty
    pub fn default_environments(&self) -> Vec<String> {
        if self.global.envlist.is_empty() {
            self.environment_names().map(String::from).collect()
        } else {
            self.global.envlist.clone()
        }
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.environments.contains_key(name)
    }

    /// Section configuring `name`: `None` when undeclared, `Some(None)` when
    /// only `[testenv]` applies
    pub(crate) fn section_for(&self, name: &str) -> Option<Option<&str>> {
        self.environments.get(name).map(Option::as_deref)
    }

    /// Resolve one environment
    pub fn resolve(&self, name: &str) -> Result<ResolvedEnvironment> {
        resolve_environment(self, name)
    }

    /// Resolve every declared environment, stopping at the first error
    pub fn resolve_all(&self) -> Result<Vec<ResolvedEnvironment>> {
        self.environment_names()
            .map(|name| self.resolve(name))
            .collect()
    }

    /// Resolve every declared environment and report what is wrong
    pub fn check(&self) -> Vec<Problem> {
        let mut problems = Vec::new();

        for name in self.environment_names() {
            match self.resolve(name) {
                Ok(env) if env.commands.is_empty() => problems.push(Problem::NoCommands {
                    environment: name.to_string(),
                }),
                Ok(_) => {}
                Err(error) => problems.push(Problem::Unresolvable {
                    environment: name.to_string(),
                    error,
                }),
            }
        }

        problems
    }
}

/// Parse a boolean setting
pub fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(Error::invalid_value(key, value.trim(), "expected a boolean")),
    }
}

fn read_global(document: &Document, context: &ConfigContext) -> Result<GlobalSettings> {
    let substitutor = Substitutor::new(
        SubstitutionContext {
            toxinidir: &context.toxinidir,
            toxworkdir: None,
            homedir: context.homedir.as_deref(),
            env_name: None,
            posargs: context.posargs.as_deref(),
            host_env: &context.host_env,
        },
        document,
        &[],
    );
    let value = |key: &str| document.value(GLOBAL_SECTION, key);

    let envlist = match value("envlist") {
        Some(raw) => expand_env_list(raw)?,
        None => Vec::new(),
    };

    let skip_missing_interpreters = value("skip_missing_interpreters")
        .map(|v| parse_bool("skip_missing_interpreters", v))
        .transpose()?
        .unwrap_or(false);
    let skipsdist = value("skipsdist")
        .map(|v| parse_bool("skipsdist", v))
        .transpose()?
        .unwrap_or(false);

    let default_work_dir = format!("{{toxinidir}}/{DEFAULT_WORK_DIR}");
    let work_dir = substitutor.substitute(value("toxworkdir").unwrap_or(&default_work_dir))?;
    let toxworkdir = absolutize(&context.toxinidir, Path::new(work_dir.trim()));

    let minversion = value("minversion")
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from);

    Ok(GlobalSettings {
        envlist,
        skip_missing_interpreters,
        toxworkdir,
        minversion,
        skipsdist,
    })
}

/// Map each declared environment to its section
///
/// An exact `[testenv:NAME]` wins over a generative section that also
/// produces `NAME`; among generative sections the first one wins.
fn declare_environments(
    document: &Document,
    envlist: &[String],
) -> Result<IndexMap<String, Option<String>>> {
    let mut environments: IndexMap<String, Option<String>> =
        envlist.iter().map(|name| (name.clone(), None)).collect();

    for section in document.sections() {
        let Some(pattern) = section.name.strip_prefix(ENV_SECTION_PREFIX) else {
            continue;
        };
        let pattern = pattern.trim();
        let exact = !pattern.contains('{');
        let names = expand_braces("section name", pattern)
            .map_err(|e| Error::parse(section.line, e.to_string()))?;

        for name in names.into_iter().filter(|n| !n.is_empty()) {
            let slot = environments.entry(name).or_insert(None);
            if exact || slot.is_none() {
                *slot = Some(section.name.clone());
            }
        }
    }

    Ok(environments)
}

fn log_unknown_keys(document: &Document) {
    for section in document.sections() {
        let known = if section.name == GLOBAL_SECTION {
            KNOWN_GLOBAL_KEYS
        } else if section.name == BASE_ENV_SECTION
            || section.name.starts_with(ENV_SECTION_PREFIX)
        {
            KNOWN_ENV_KEYS
        } else {
            continue;
        };

        for entry in section.entries().filter(|e| !known.contains(&e.key.as_str())) {
            tracing::debug!(
                section = %section.name,
                key = %entry.key,
                line = entry.line,
                "ignoring unknown key"
            );
        }
    }
}
