//! Environment-related types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;

/// Wrapper type for the variables handed to a child process
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariables(HashMap<String, String>);

impl EnvironmentVariables {
    /// Create a new empty environment
    #[must_use]
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Snapshot the current process environment
    #[must_use]
    pub fn from_process() -> Self {
        Self(std::env::vars().collect())
    }

    /// Insert a variable, returning the previous value if any
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Filter variables by a predicate
    #[must_use]
    pub fn filter<F>(&self, predicate: F) -> Self
    where
        F: Fn(&str, &str) -> bool,
    {
        let filtered = self
            .0
            .iter()
            .filter(|(k, v)| predicate(k, v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self(filtered)
    }

    /// Convert to the inner HashMap
    #[must_use]
    pub fn into_inner(self) -> HashMap<String, String> {
        self.0
    }
}

impl Deref for EnvironmentVariables {
    type Target = HashMap<String, String>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<HashMap<String, String>> for EnvironmentVariables {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, String)> for EnvironmentVariables {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for EnvironmentVariables {
    type Item = (String, String);
    type IntoIter = std::collections::hash_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Type-safe wrapper for environment names
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentName(String);

impl EnvironmentName {
    /// Create a new environment name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the name as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `-`-separated factors of this name
    ///
    /// `mypy-py38` has factors `mypy` and `py38`.
    pub fn factors(&self) -> impl Iterator<Item = &str> {
        self.0.split('-').filter(|f| !f.is_empty())
    }
}

impl fmt::Display for EnvironmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EnvironmentName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&str> for EnvironmentName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factors_split_on_dash() {
        let name = EnvironmentName::new("mypy-py38");
        assert_eq!(name.factors().collect::<Vec<_>>(), vec!["mypy", "py38"]);

        let name = EnvironmentName::new("docs");
        assert_eq!(name.factors().collect::<Vec<_>>(), vec!["docs"]);
    }

    #[test]
    fn test_filter() {
        let env: EnvironmentVariables = [
            ("PATH".to_string(), "/usr/bin".to_string()),
            ("SECRET".to_string(), "x".to_string()),
        ]
        .into_iter()
        .collect();

        let kept = env.filter(|k, _| k == "PATH");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept.get("PATH").map(String::as_str), Some("/usr/bin"));
    }
}
