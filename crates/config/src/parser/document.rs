//! Parsed document types

use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// A single `key = value` entry
///
/// Continuation lines are joined with `\n`; blank lines are not kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: String,
    pub line: usize,
}

impl Entry {
    /// Non-empty lines of the value
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.value.lines().filter(|l| !l.trim().is_empty())
    }
}

/// A bracketed section and its entries in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub line: usize,
    pub(crate) entries: IndexMap<String, Entry>,
}

impl Section {
    pub(crate) fn new(name: impl Into<String>, line: usize) -> Self {
        Self {
            name: name.into(),
            line,
            entries: IndexMap::new(),
        }
    }

    /// Look up an entry by key
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    /// Look up a raw value by key
    pub fn value(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|e| e.value.as_str())
    }

    /// Whether the section declares `key`
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Entries in declaration order
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }
}

/// A parsed configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub(crate) source: Option<PathBuf>,
    pub(crate) sections: IndexMap<String, Section>,
}

impl Document {
    /// Path the document was read from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Record the file this document came from
    #[must_use]
    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    /// Look up a section by its exact name
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    /// Sections in declaration order
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.values()
    }

    /// Look up a raw value in a section
    pub fn value(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section).and_then(|s| s.value(key))
    }
}
