//! Dependency specifiers
//!
//! A specifier is `name[extras] constraint ; marker`. Lines starting with
//! `-` are installer options (`-r requirements.txt`) and paths or URLs are
//! kept verbatim; neither takes part in conflict detection.

use envmatrix_core::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// One entry of an environment's `deps`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencySpec {
    pub raw: String,
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extras: Vec<String>,
    pub constraint: Option<String>,
    pub marker: Option<String>,
}

impl DependencySpec {
    /// Parse a single `deps` line
    pub fn parse(line: &str) -> Result<Self> {
        let raw = line.trim().to_string();
        let verbatim = || Self {
            raw: raw.clone(),
            name: None,
            extras: Vec::new(),
            constraint: None,
            marker: None,
        };

        if raw.starts_with('-') || !raw.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            return Ok(verbatim());
        }

        let (requirement, marker) = match raw.split_once(';') {
            Some((req, marker)) => (req.trim(), Some(marker.trim().to_string())),
            None => (raw.as_str(), None),
        };

        let name_end = requirement
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
            .unwrap_or(requirement.len());
        let name = &requirement[..name_end];
        let mut rest = requirement[name_end..].trim_start();

        let mut extras = Vec::new();
        if let Some(inner) = rest.strip_prefix('[') {
            let close = inner
                .find(']')
                .ok_or_else(|| Error::invalid_value("deps", &raw, "extras are missing ']'"))?;
            extras = inner[..close]
                .split(',')
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(String::from)
                .collect();
            rest = inner[close + 1..].trim_start();
        }

        if !rest.is_empty() && !rest.starts_with(['=', '<', '>', '!', '~', '@']) {
            // A path such as `lib/dist.whl`: not a named requirement
            return Ok(verbatim());
        }

        Ok(Self {
            raw: raw.clone(),
            name: Some(name.to_string()),
            extras,
            constraint: (!rest.is_empty()).then(|| rest.trim().to_string()),
            marker: marker.filter(|m| !m.is_empty()),
        })
    }

    /// Whether this specifier names a package
    pub fn is_package(&self) -> bool {
        self.name.is_some()
    }

    /// Package name folded for comparison: `Foo_Bar.baz` becomes `foo-bar-baz`
    pub fn normalized_name(&self) -> Option<String> {
        self.name.as_deref().map(normalize_name)
    }

    fn normalized_constraint(&self) -> Option<String> {
        self.constraint
            .as_ref()
            .map(|c| c.chars().filter(|ch| !ch.is_whitespace()).collect())
    }

    fn normalized_marker(&self) -> Option<String> {
        self.marker
            .as_ref()
            .map(|m| m.chars().filter(|ch| !ch.is_whitespace()).collect())
    }
}

impl FromStr for DependencySpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn normalize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '_' | '.' => '-',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

/// Parse the `deps` lines of `environment`, dropping exact duplicates and
/// rejecting two different constraints on the same package
///
/// Specifiers with different markers never conflict, and an unconstrained
/// specifier may sit next to a constrained one.
pub fn collect_dependencies<'a, I>(environment: &str, lines: I) -> Result<Vec<DependencySpec>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut specs: Vec<DependencySpec> = Vec::new();

    for line in lines {
        let spec = DependencySpec::parse(line)?;

        if let Some(name) = spec.normalized_name() {
            let mut duplicate = false;
            for existing in specs
                .iter()
                .filter(|s| s.normalized_name().as_deref() == Some(name.as_str()))
                .filter(|s| s.normalized_marker() == spec.normalized_marker())
            {
                match (existing.normalized_constraint(), spec.normalized_constraint()) {
                    (Some(a), Some(b)) if a != b => {
                        return Err(Error::dependency_conflict(
                            environment,
                            name,
                            &existing.raw,
                            &spec.raw,
                        ));
                    }
                    (a, b) if a == b => duplicate = true,
                    _ => {}
                }
            }
            if duplicate {
                continue;
            }
        } else if specs.iter().any(|s| s.raw == spec.raw) {
            continue;
        }

        specs.push(spec);
    }

    Ok(specs)
}
