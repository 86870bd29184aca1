//! Line-oriented INI syntax
//!
//! Grammar:
//! - `[name]` opens a section; names are unique per file
//! - `key = value` or `key: value` declares a key; the first separator wins
//! - an indented line continues the previous key's value
//! - `#` or `;` at the start of a line is a comment; `#` after whitespace
//!   starts an inline comment, `\#` is a literal `#`

use super::document::{Document, Entry, Section};
use envmatrix_core::{Error, Result};

/// Parse configuration text into a [`Document`]
///
/// Errors carry the 1-based line number; attach a path with
/// [`Error::with_path`] when the text came from a file.
pub fn parse(text: &str) -> Result<Document> {
    let mut document = Document::default();
    let mut current_section: Option<String> = None;
    let mut current_key: Option<String> = None;

    for (index, raw_line) in text.lines().enumerate() {
        let line_no = index + 1;

        if raw_line.trim().is_empty() || is_comment(raw_line) {
            continue;
        }

        let content = strip_inline_comment(raw_line);
        let content = content.trim_end();
        if content.trim().is_empty() {
            continue;
        }

        if raw_line.starts_with([' ', '\t']) {
            let entry = current_section
                .as_ref()
                .zip(current_key.as_ref())
                .and_then(|(section, key)| document.sections.get_mut(section)?.entries.get_mut(key))
                .ok_or_else(|| Error::parse(line_no, "continuation line without a preceding key"))?;

            if !entry.value.is_empty() {
                entry.value.push('\n');
            }
            entry.value.push_str(content.trim());
            continue;
        }

        if content.starts_with('[') {
            let name = parse_section_header(content, line_no)?;
            if document.sections.contains_key(&name) {
                let first = document.sections[&name].line;
                return Err(Error::parse(
                    line_no,
                    format!("section '{name}' already declared on line {first}"),
                ));
            }
            document
                .sections
                .insert(name.clone(), Section::new(name.clone(), line_no));
            current_section = Some(name);
            current_key = None;
            continue;
        }

        let section_name = current_section.as_ref().ok_or_else(|| {
            Error::parse(line_no, "key declared before any section header")
        })?;
        let (key, value) = split_key_value(content, line_no)?;

        let section = document
            .sections
            .get_mut(section_name)
            .ok_or_else(|| Error::parse(line_no, "section vanished while parsing"))?;
        if let Some(existing) = section.entries.get(&key) {
            return Err(Error::parse(
                line_no,
                format!(
                    "key '{key}' already declared in section '{section_name}' on line {}",
                    existing.line
                ),
            ));
        }
        section.entries.insert(
            key.clone(),
            Entry {
                key: key.clone(),
                value,
                line: line_no,
            },
        );
        current_key = Some(key);
    }

    Ok(document)
}

fn is_comment(line: &str) -> bool {
    matches!(line.trim_start().chars().next(), Some('#') | Some(';'))
}

/// Drop a `#` comment that follows whitespace and unescape `\#`
fn strip_inline_comment(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    let mut prev_is_space = false;

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'#') => {
                out.push('#');
                chars.next();
                prev_is_space = false;
            }
            '#' if prev_is_space => break,
            _ => {
                prev_is_space = c.is_whitespace();
                out.push(c);
            }
        }
    }

    out
}

fn parse_section_header(content: &str, line_no: usize) -> Result<String> {
    let close = content
        .find(']')
        .ok_or_else(|| Error::parse(line_no, "section header is missing ']'"))?;

    let name = content[1..close].trim();
    if name.is_empty() {
        return Err(Error::parse(line_no, "section name is empty"));
    }

    let rest = content[close + 1..].trim();
    if !rest.is_empty() {
        return Err(Error::parse(
            line_no,
            format!("unexpected text '{rest}' after section header"),
        ));
    }

    Ok(name.to_string())
}

fn split_key_value(content: &str, line_no: usize) -> Result<(String, String)> {
    let separator = content
        .find(['=', ':'])
        .ok_or_else(|| Error::parse(line_no, format!("expected 'key = value', found '{content}'")))?;

    let key = content[..separator].trim();
    if key.is_empty() {
        return Err(Error::parse(line_no, "key is empty"));
    }

    Ok((key.to_string(), content[separator + 1..].trim().to_string()))
}
