//! Child process environment and program lookup

use envmatrix_config::ResolvedEnvironment;
use envmatrix_core::{
    EnvironmentVariables, Error, Result, DEFAULT_PASSENV, ENV_DIR_VAR, ENV_NAME_VAR, WORK_DIR_VAR,
};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};

/// Compile `passenv` patterns such as `LC_*` into a matcher
pub fn passenv_matcher(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in DEFAULT_PASSENV
        .iter()
        .copied()
        .chain(patterns.iter().map(String::as_str))
    {
        let glob = Glob::new(pattern)
            .map_err(|e| Error::invalid_value("passenv", pattern, e.to_string()))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| Error::invalid_value("passenv", patterns.join(" "), e.to_string()))
}

/// Variables a command of `env` runs with
///
/// Host variables matching the default or configured `passenv` patterns come
/// first, `setenv` overrides them, and the `TOX_*` markers are set last.
pub fn child_environment(
    env: &ResolvedEnvironment,
    host_env: &EnvironmentVariables,
    work_dir: &Path,
) -> Result<EnvironmentVariables> {
    let matcher = passenv_matcher(&env.passenv)?;
    let mut vars = host_env.filter(|key, _| matcher.is_match(key));

    for (key, value) in &env.setenv {
        vars.insert(key.clone(), value.clone());
    }

    vars.insert(ENV_NAME_VAR, env.name.as_str());
    vars.insert(ENV_DIR_VAR, env.envdir.to_string_lossy());
    vars.insert(WORK_DIR_VAR, work_dir.to_string_lossy());

    Ok(vars)
}

/// Locate `program` on the `PATH` of `vars`, relative to `cwd`
pub fn find_program(program: &str, vars: &EnvironmentVariables, cwd: &Path) -> Option<PathBuf> {
    let path = vars.get("PATH").map(String::as_str).unwrap_or_default();
    which::which_in(program, Some(path), cwd).ok()
}

/// Whether `program` may run outside the environment without a warning
pub fn is_allowlisted(program: &str, allowlist: &[String]) -> bool {
    let file_name = Path::new(program)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(program);

    allowlist.iter().any(|entry| {
        if entry == program || entry == file_name {
            return true;
        }
        Glob::new(entry)
            .map(|glob| glob.compile_matcher().is_match(program))
            .unwrap_or(false)
    })
}
