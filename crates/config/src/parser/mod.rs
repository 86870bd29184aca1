//! INI parser for tox-style configuration files
//!
//! This module turns configuration text into a [`Document`]: ordered
//! sections holding ordered keys with multi-line values. It knows nothing
//! about environments; the meaning of keys is applied by the resolver.

mod document;
mod syntax;

pub use document::{Document, Entry, Section};
pub use syntax::parse;

#[cfg(test)]
mod tests;
