//! Text rendering for command output

use envmatrix_config::{Config, ResolvedEnvironment};
use envmatrix_task::{EnvReport, EnvStatus, RunReport};
use std::fmt::Write;

/// One declared environment per line, with descriptions when `verbose`
pub fn environment_list(config: &Config, verbose: bool) -> String {
    let mut out = String::new();
    let names: Vec<&str> = config.environment_names().collect();
    let width = names.iter().map(|n| n.len()).max().unwrap_or(0);

    for name in names {
        if !verbose {
            let _ = writeln!(out, "{name}");
            continue;
        }
        let description = match config.resolve(name) {
            Ok(env) => env.description.unwrap_or_default(),
            Err(e) => format!("<{e}>"),
        };
        let _ = writeln!(out, "{name:<width$} -> {description}");
    }

    out
}

pub fn environment_details(env: &ResolvedEnvironment) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[{}]", env.name);

    if let Some(description) = &env.description {
        let _ = writeln!(out, "  description: {description}");
    }
    if let Some(basepython) = &env.basepython {
        let _ = writeln!(out, "  basepython: {basepython}");
    }

    list(&mut out, "deps", env.dependency_strings());
    list(&mut out, "commands", env.commands.iter().map(ToString::to_string));

    let _ = writeln!(out, "  changedir: {}", env.changedir.display());
    let _ = writeln!(out, "  envdir: {}", env.envdir.display());

    if !env.passenv.is_empty() {
        let _ = writeln!(out, "  passenv: {}", env.passenv.join(" "));
    }
    list(
        &mut out,
        "setenv",
        env.setenv.iter().map(|(k, v)| format!("{k}={v}")),
    );
    if !env.allowlist_externals.is_empty() {
        let _ = writeln!(
            out,
            "  allowlist_externals: {}",
            env.allowlist_externals.join(" ")
        );
    }
    if env.ignore_errors {
        let _ = writeln!(out, "  ignore_errors: true");
    }
    if env.ignore_outcome {
        let _ = writeln!(out, "  ignore_outcome: true");
    }

    out.push('\n');
    out
}

/// Resolved environments as a pretty-printed JSON array
pub fn environments_json(envs: &[ResolvedEnvironment]) -> envmatrix_core::Result<String> {
    Ok(serde_json::to_string_pretty(envs)?)
}

fn list<I, S>(out: &mut String, label: &str, items: I)
where
    I: IntoIterator<Item = S>,
    S: std::fmt::Display,
{
    let mut items = items.into_iter().peekable();
    if items.peek().is_none() {
        return;
    }
    let _ = writeln!(out, "  {label}:");
    for item in items {
        let _ = writeln!(out, "    {item}");
    }
}

pub fn run_summary(report: &RunReport) -> String {
    let mut out = String::from("summary\n");
    for env in &report.environments {
        let _ = writeln!(out, "  {}", env_line(env));
        if env.status == EnvStatus::Planned {
            for outcome in &env.commands {
                let _ = writeln!(out, "    would run: {}", outcome.command);
            }
        }
    }

    out.push_str(if report.succeeded() {
        "run succeeded\n"
    } else {
        "run failed\n"
    });
    out
}

fn env_line(env: &EnvReport) -> String {
    let secs = env.duration.as_secs_f64();
    match &env.status {
        EnvStatus::Succeeded => format!("{}: OK ({secs:.2}s)", env.name),
        EnvStatus::Failed => {
            let detail = env
                .commands
                .iter()
                .rev()
                .find(|c| !c.succeeded() && !c.command.ignore_exit)
                .map(|c| match (&c.error, c.exit_code) {
                    (Some(error), _) => format!(" '{}': {error}", c.command.raw),
                    (None, Some(code)) => format!(" '{}' exited with {code}", c.command.raw),
                    (None, None) => format!(" '{}' was terminated", c.command.raw),
                })
                .unwrap_or_default();
            format!("{}: FAIL{detail} ({secs:.2}s)", env.name)
        }
        EnvStatus::IgnoredFailure => format!("{}: IGNORED FAIL ({secs:.2}s)", env.name),
        EnvStatus::Skipped { reason } => format!("{}: SKIP ({reason})", env.name),
        EnvStatus::Planned => format!("{}: planned", env.name),
        EnvStatus::Errored { message } => format!("{}: ERROR ({message})", env.name),
    }
}
