//! Environment resolution
//!
//! Each setting is taken from the environment's own section when it
//! declares the key, otherwise from `[testenv]`, otherwise from its default.
//! The chosen value is factor-filtered, substituted and then parsed into the
//! typed field of [`ResolvedEnvironment`].

use crate::config::{parse_bool, Config};
use crate::dependency::{collect_dependencies, DependencySpec};
use crate::matrix::filter_conditional_lines;
use crate::substitution::{ShellState, SubstitutionContext, Substitutor};
use envmatrix_core::{EnvironmentName, Error, Result, BASE_ENV_SECTION};
use envmatrix_utils::absolutize;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Keys understood inside `[testenv]` and `[testenv:NAME]`
pub const KNOWN_ENV_KEYS: &[&str] = &[
    "description",
    "basepython",
    "deps",
    "commands",
    "changedir",
    "passenv",
    "setenv",
    "allowlist_externals",
    "whitelist_externals",
    "ignore_errors",
    "ignore_outcome",
];

/// One command of an environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandLine {
    /// The command as written, without a leading `-`
    pub raw: String,
    pub argv: Vec<String>,
    /// A leading `-` means a non-zero exit does not stop the environment
    pub ignore_exit: bool,
}

impl CommandLine {
    /// Split a command line into words
    pub fn parse(environment: &str, line: &str) -> Result<Self> {
        let trimmed = line.trim();
        let (ignore_exit, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, trimmed),
        };

        let argv = shlex::split(body)
            .ok_or_else(|| Error::invalid_command(environment, trimmed, "unbalanced quotes"))?;
        if argv.is_empty() {
            return Err(Error::invalid_command(environment, trimmed, "empty command"));
        }

        Ok(Self {
            raw: body.to_string(),
            argv,
            ignore_exit,
        })
    }

    /// The program to execute
    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    /// Arguments after the program
    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ignore_exit {
            write!(f, "- {}", self.raw)
        } else {
            f.write_str(&self.raw)
        }
    }
}

/// Fully merged settings of one environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedEnvironment {
    pub name: EnvironmentName,
    pub factors: Vec<String>,
    pub description: Option<String>,
    pub basepython: Option<String>,
    pub deps: Vec<DependencySpec>,
    pub commands: Vec<CommandLine>,
    pub changedir: PathBuf,
    pub envdir: PathBuf,
    pub passenv: Vec<String>,
    pub setenv: IndexMap<String, String>,
    pub allowlist_externals: Vec<String>,
    pub ignore_errors: bool,
    pub ignore_outcome: bool,
}

impl ResolvedEnvironment {
    /// Dependency specifiers as written
    pub fn dependency_strings(&self) -> Vec<String> {
        self.deps.iter().map(ToString::to_string).collect()
    }

    /// Commands as written
    pub fn command_strings(&self) -> Vec<String> {
        self.commands.iter().map(|c| c.raw.clone()).collect()
    }
}

pub(crate) fn resolve_environment(config: &Config, name: &str) -> Result<ResolvedEnvironment> {
    let section_name = config.section_for(name).ok_or_else(|| {
        Error::unknown_environment(
            name,
            config.environment_names().map(String::from).collect(),
        )
    })?;

    let document = config.document();
    let env_section = section_name.and_then(|s| document.section(s));
    let base_section = document.section(BASE_ENV_SECTION);

    let env_name = EnvironmentName::new(name);
    let factors: Vec<&str> = env_name.factors().collect();
    let context = config.context();
    let toxworkdir = config.global().toxworkdir.as_path();

    let substitutor = Substitutor::new(
        SubstitutionContext {
            toxinidir: &context.toxinidir,
            toxworkdir: Some(toxworkdir),
            homedir: context.homedir.as_deref(),
            env_name: Some(name),
            posargs: context.posargs.as_deref(),
            host_env: &context.host_env,
        },
        document,
        &factors,
    );

    let filtered = |keys: &[&str]| -> Result<Option<String>> {
        let raw = [env_section, base_section]
            .into_iter()
            .flatten()
            .find_map(|section| keys.iter().find_map(|key| section.value(key)));
        match raw {
            None => Ok(None),
            Some(raw) => Ok(Some(filter_conditional_lines(raw, &factors)?.join("\n"))),
        }
    };
    let setting = |keys: &[&str]| -> Result<Option<String>> {
        filtered(keys)?
            .map(|value| substitutor.substitute(&value))
            .transpose()
    };

    let description = setting(&["description"])?
        .map(|d| d.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|d| !d.is_empty());

    let basepython = setting(&["basepython"])?
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty())
        .or_else(|| default_basepython(&factors));

    let deps_value = setting(&["deps"])?.unwrap_or_default();
    let deps = collect_dependencies(name, non_empty_lines(&deps_value))?;

    let commands = match filtered(&["commands"])? {
        Some(value) => parse_commands(name, &substitutor.substitute_command(&value)?)?,
        None => Vec::new(),
    };

    let changedir = match setting(&["changedir"])? {
        Some(dir) if !dir.trim().is_empty() => absolutize(&context.toxinidir, Path::new(dir.trim())),
        _ => context.toxinidir.clone(),
    };

    let passenv = split_words(&setting(&["passenv"])?.unwrap_or_default());
    let setenv = parse_setenv(&setting(&["setenv"])?.unwrap_or_default())?;
    let allowlist_externals = split_words(
        &setting(&["allowlist_externals", "whitelist_externals"])?.unwrap_or_default(),
    );

    let ignore_errors = match setting(&["ignore_errors"])? {
        Some(v) => parse_bool("ignore_errors", &v)?,
        None => false,
    };
    let ignore_outcome = match setting(&["ignore_outcome"])? {
        Some(v) => parse_bool("ignore_outcome", &v)?,
        None => false,
    };

    tracing::debug!(
        environment = %name,
        section = section_name.unwrap_or(BASE_ENV_SECTION),
        deps = deps.len(),
        commands = commands.len(),
        "resolved environment"
    );

    Ok(ResolvedEnvironment {
        factors: factors.iter().map(|f| f.to_string()).collect(),
        envdir: toxworkdir.join(name),
        name: env_name.clone(),
        description,
        basepython,
        deps,
        commands,
        changedir,
        passenv,
        setenv,
        allowlist_externals,
        ignore_errors,
        ignore_outcome,
    })
}

fn non_empty_lines(value: &str) -> impl Iterator<Item = &str> {
    value.lines().map(str::trim).filter(|l| !l.is_empty())
}

fn parse_commands(environment: &str, value: &str) -> Result<Vec<CommandLine>> {
    split_command_lines(value)
        .iter()
        .map(|line| CommandLine::parse(environment, line))
        .collect()
}

/// One string per command
///
/// Newlines inside quotes stay in the command. A line ending in `\` is
/// joined with the next one.
fn split_command_lines(value: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut shell = ShellState::default();
    let mut joining = false;

    for c in value.chars() {
        if joining && c.is_whitespace() && c != '\n' {
            continue;
        }
        joining = false;

        if c != '\n' || shell.is_quoted() {
            current.push(c);
            shell.feed(c);
            continue;
        }

        shell = ShellState::default();
        let kept = current.trim_end().len();
        if current[..kept].ends_with('\\') {
            let kept = current[..kept - 1].trim_end().len();
            current.truncate(kept);
            current.push(' ');
            joining = true;
            continue;
        }
        push_line(&mut lines, &mut current);
    }

    push_line(&mut lines, &mut current);
    lines
}

fn push_line(lines: &mut Vec<String>, current: &mut String) {
    let line = current.trim();
    if !line.is_empty() {
        lines.push(line.to_string());
    }
    current.clear();
}

fn split_words(value: &str) -> Vec<String> {
    value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|w| !w.is_empty())
        .map(String::from)
        .collect()
}

fn parse_setenv(value: &str) -> Result<IndexMap<String, String>> {
    let mut vars = IndexMap::new();

    for line in non_empty_lines(value) {
        let (key, val) = line
            .split_once('=')
            .ok_or_else(|| Error::invalid_value("setenv", line, "expected KEY=VALUE"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::invalid_value("setenv", line, "variable name is empty"));
        }
        vars.insert(key.to_string(), val.trim().to_string());
    }

    Ok(vars)
}

/// Interpreter implied by a factor: `py38` is `python3.8`, `pypy3` is `pypy3`
fn default_basepython(factors: &[&str]) -> Option<String> {
    let dotted = |prefix: &str, digits: &str| match digits.len() {
        0 | 1 => format!("{prefix}{digits}"),
        _ => format!("{prefix}{}.{}", &digits[..1], &digits[1..]),
    };
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());

    factors.iter().find_map(|factor| {
        if let Some(digits) = factor.strip_prefix("pypy") {
            return all_digits(digits).then(|| dotted("pypy", digits));
        }
        let digits = factor.strip_prefix("py")?;
        all_digits(digits).then(|| dotted("python", digits))
    })
}
