//! Environment matrix helpers
//!
//! Generative names (`py{36,37}-lxml{4,5}`), `envlist` splitting and
//! factor-conditional lines (`docs: Sphinx`).

use envmatrix_core::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static CONDITION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([\w{}.!,-]+):\s+(\S.*)$").expect("condition regex is valid"));

/// Expand every `{a,b,...}` group in `pattern` into the cartesian product
///
/// `key` names the setting being expanded and is only used in errors.
pub fn expand_braces(key: &str, pattern: &str) -> Result<Vec<String>> {
    let mut results = vec![String::new()];
    let mut rest = pattern;

    while !rest.is_empty() {
        match rest.find(['{', '}']) {
            None => {
                for r in &mut results {
                    r.push_str(rest);
                }
                break;
            }
            Some(pos) if rest[pos..].starts_with('}') => {
                return Err(Error::invalid_value(key, pattern, "unbalanced '}'"));
            }
            Some(open) => {
                let literal = &rest[..open];
                let after = &rest[open + 1..];
                let close = after
                    .find('}')
                    .ok_or_else(|| Error::invalid_value(key, pattern, "unbalanced '{'"))?;
                let group = &after[..close];
                if group.contains('{') {
                    return Err(Error::invalid_value(
                        key,
                        pattern,
                        "nested braces are not supported",
                    ));
                }

                let alternatives: Vec<&str> = group.split(',').map(str::trim).collect();
                results = results
                    .iter()
                    .flat_map(|prefix| {
                        alternatives
                            .iter()
                            .map(move |alt| format!("{prefix}{literal}{alt}"))
                    })
                    .collect();
                rest = &after[close + 1..];
            }
        }
    }

    Ok(results)
}

/// Split an `envlist` value on commas and newlines that are not inside braces
pub fn split_env_list(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for c in value.chars() {
        match c {
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' | '\n' if depth == 0 => {
                items.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    items.push(current);

    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Split and expand an `envlist` value, keeping the first occurrence of
/// each name
pub fn expand_env_list(value: &str) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();

    for item in split_env_list(value) {
        for name in expand_braces("envlist", &item)? {
            if seen.insert(name.clone()) {
                names.push(name);
            }
        }
    }

    Ok(names)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FactorTerm {
    factor: String,
    negated: bool,
}

/// A parsed `COND:` prefix
///
/// Alternatives are separated by `,`; factors inside an alternative are
/// joined with `-` and must all hold. `!` negates a factor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactorCondition {
    alternatives: Vec<Vec<FactorTerm>>,
}

impl FactorCondition {
    /// Parse a condition such as `py{37,38}-!lxml,docs`
    pub fn parse(condition: &str) -> Result<Self> {
        let mut alternatives = Vec::new();

        for expanded in expand_braces("condition", condition)? {
            for alternative in expanded.split(',') {
                let terms: Vec<FactorTerm> = alternative
                    .split('-')
                    .filter(|f| !f.is_empty())
                    .map(|f| match f.strip_prefix('!') {
                        Some(factor) => FactorTerm {
                            factor: factor.to_string(),
                            negated: true,
                        },
                        None => FactorTerm {
                            factor: f.to_string(),
                            negated: false,
                        },
                    })
                    .collect();
                if !terms.is_empty() {
                    alternatives.push(terms);
                }
            }
        }

        Ok(Self { alternatives })
    }

    /// Whether an environment with `factors` satisfies this condition
    pub fn matches(&self, factors: &HashSet<&str>) -> bool {
        self.alternatives.iter().any(|terms| {
            terms
                .iter()
                .all(|term| factors.contains(term.factor.as_str()) != term.negated)
        })
    }
}

/// Split a line into an optional factor condition and the remaining text
pub fn split_condition(line: &str) -> Option<(&str, &str)> {
    CONDITION_RE.captures(line).and_then(|caps| {
        let condition = caps.get(1)?.as_str();
        let rest = caps.get(2)?.as_str();
        Some((condition, rest))
    })
}

/// Keep the lines of `value` that apply to an environment with `factors`,
/// with their condition prefixes removed
pub fn filter_conditional_lines<'a>(value: &'a str, factors: &[&str]) -> Result<Vec<&'a str>> {
    let factor_set: HashSet<&str> = factors.iter().copied().collect();
    let mut kept = Vec::new();

    for line in value.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match split_condition(line) {
            Some((condition, rest)) => {
                if FactorCondition::parse(condition)?.matches(&factor_set) {
                    kept.push(rest);
                }
            }
            None => kept.push(line),
        }
    }

    Ok(kept)
}
