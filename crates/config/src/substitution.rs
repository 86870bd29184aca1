//! `{placeholder}` substitution
//!
//! Supported tokens: `{toxinidir}`, `{toxworkdir}`, `{homedir}`,
//! `{envname}`, `{envdir}`, `{envtmpdir}`, `{envbindir}`,
//! `{posargs[:DEFAULT]}`, `{env:KEY[:DEFAULT]}`, `{[section]key}`, `{:}`
//! and `{/}`. `\{` and `\}` produce literal braces.
//!
//! Command text is substituted in shell mode: every expanded value is quoted
//! for the position it lands in, so splitting the result into words keeps
//! paths with spaces and each positional argument whole.

use crate::matrix::filter_conditional_lines;
use crate::parser::Document;
use envmatrix_core::{EnvironmentVariables, Error, Result, MAX_SUBSTITUTION_DEPTH};
use std::path::{Path, PathBuf};

/// Values available to placeholders
#[derive(Debug, Clone, Copy)]
pub struct SubstitutionContext<'a> {
    pub toxinidir: &'a Path,
    pub toxworkdir: Option<&'a Path>,
    pub homedir: Option<&'a Path>,
    pub env_name: Option<&'a str>,
    pub posargs: Option<&'a [String]>,
    pub host_env: &'a EnvironmentVariables,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Plain,
    Shell,
}

/// What a single token expands to
enum Expansion {
    /// A path or variable value
    Value(String),
    /// Positional arguments, one word each
    Words(Vec<String>),
    /// Configuration text that has already been substituted
    Fragment(String),
}

/// Quoting state of POSIX shell text read so far
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ShellState {
    quote: Option<char>,
    escaped: bool,
}

impl ShellState {
    pub(crate) fn feed(&mut self, c: char) {
        if self.escaped {
            self.escaped = false;
            return;
        }
        match (self.quote, c) {
            (Some('\''), '\'') => self.quote = None,
            (Some('\''), _) => {}
            (_, '\\') => self.escaped = true,
            (Some('"'), '"') => self.quote = None,
            (None, '"' | '\'') => self.quote = Some(c),
            _ => {}
        }
    }

    pub(crate) fn is_quoted(&self) -> bool {
        self.quote.is_some()
    }

    fn is_escaped(&self) -> bool {
        self.escaped
    }
}

/// Expands placeholders against a context and, for `{[section]key}`
/// references, the document they came from
pub struct Substitutor<'a> {
    context: SubstitutionContext<'a>,
    document: &'a Document,
    factors: &'a [&'a str],
}

impl<'a> Substitutor<'a> {
    pub fn new(
        context: SubstitutionContext<'a>,
        document: &'a Document,
        factors: &'a [&'a str],
    ) -> Self {
        Self {
            context,
            document,
            factors,
        }
    }

    /// Expand every placeholder in `value`, inserting values verbatim
    pub fn substitute(&self, value: &str) -> Result<String> {
        self.substitute_at_depth(value, 0, Mode::Plain)
    }

    /// Expand every placeholder in command text, quoting each value so that
    /// a later shell-word split keeps it in one piece
    pub fn substitute_command(&self, value: &str) -> Result<String> {
        self.substitute_at_depth(value, 0, Mode::Shell)
    }

    fn substitute_at_depth(&self, value: &str, depth: usize, mode: Mode) -> Result<String> {
        if depth > MAX_SUBSTITUTION_DEPTH {
            return Err(Error::substitution(
                value,
                "references nest too deeply (is there a cycle?)",
            ));
        }

        let mut out = String::with_capacity(value.len());
        let mut shell = ShellState::default();
        let mut chars = value.char_indices().peekable();

        while let Some((index, c)) = chars.next() {
            match c {
                '\\' if matches!(chars.peek(), Some((_, '{')) | Some((_, '}'))) => {
                    if let Some((_, escaped)) = chars.next() {
                        out.push(escaped);
                        shell.feed(escaped);
                    }
                }
                '{' => {
                    let close = matching_brace(value, index).ok_or_else(|| {
                        Error::substitution(value, format!("unclosed '{{' at offset {index}"))
                    })?;
                    let token = &value[index + 1..close];
                    let expansion = self.expand_token(value, token, depth, mode)?;
                    insert(value, &mut out, &mut shell, expansion, mode)?;
                    while chars.peek().is_some_and(|(i, _)| *i <= close) {
                        chars.next();
                    }
                }
                // each configuration line starts unquoted
                '\n' if !shell.is_escaped() => {
                    out.push(c);
                    shell = ShellState::default();
                }
                _ => {
                    out.push(c);
                    shell.feed(c);
                }
            }
        }

        Ok(out)
    }

    fn expand_token(&self, value: &str, token: &str, depth: usize, mode: Mode) -> Result<Expansion> {
        let ctx = &self.context;

        if let Some(reference) = token.strip_prefix('[') {
            let (section, key) = reference.split_once(']').ok_or_else(|| {
                Error::substitution(value, format!("malformed reference '{{{token}}}'"))
            })?;
            return self
                .expand_reference(value, section.trim(), key.trim(), depth, mode)
                .map(Expansion::Fragment);
        }

        if let Some(spec) = token.strip_prefix("env:") {
            let (name, default) = match spec.split_once(':') {
                Some((name, default)) => (name, Some(default)),
                None => (spec, None),
            };
            return match (ctx.host_env.get(name), default) {
                (Some(found), _) => Ok(Expansion::Value(found.clone())),
                (None, Some(default)) => self
                    .substitute_at_depth(default, depth + 1, mode)
                    .map(Expansion::Fragment),
                (None, None) => Err(Error::substitution(
                    value,
                    format!("environment variable '{name}' is not set and has no default"),
                )),
            };
        }

        if token == "posargs" || token.starts_with("posargs:") {
            let default = token.strip_prefix("posargs:");
            return match ctx.posargs.filter(|args| !args.is_empty()) {
                Some(args) => Ok(Expansion::Words(args.to_vec())),
                None => match default {
                    Some(default) => self
                        .substitute_at_depth(default, depth + 1, mode)
                        .map(Expansion::Fragment),
                    None => Ok(Expansion::Fragment(String::new())),
                },
            };
        }

        let path = match token {
            ":" => return Ok(Expansion::Value(path_list_separator().to_string())),
            "/" => return Ok(Expansion::Value(std::path::MAIN_SEPARATOR.to_string())),
            "toxinidir" => ctx.toxinidir.to_path_buf(),
            "toxworkdir" => self.work_dir(value)?.to_path_buf(),
            "homedir" => ctx
                .homedir
                .ok_or_else(|| Error::substitution(value, "home directory is unknown"))?
                .to_path_buf(),
            "envname" => return Ok(Expansion::Value(self.env_name(value)?.to_string())),
            "envdir" => self.env_dir(value)?,
            "envtmpdir" => self.env_dir(value)?.join("tmp"),
            "envbindir" => self.env_dir(value)?.join(bin_dir_name()),
            other => {
                return Err(Error::substitution(
                    value,
                    format!("unknown substitution '{{{other}}}'"),
                ))
            }
        };

        Ok(Expansion::Value(path.to_string_lossy().into_owned()))
    }

    fn expand_reference(
        &self,
        value: &str,
        section: &str,
        key: &str,
        depth: usize,
        mode: Mode,
    ) -> Result<String> {
        let raw = self.document.value(section, key).ok_or_else(|| {
            Error::substitution(value, format!("no key '{key}' in section '[{section}]'"))
        })?;
        let lines = filter_conditional_lines(raw, self.factors)?;
        self.substitute_at_depth(&lines.join("\n"), depth + 1, mode)
    }

    fn work_dir(&self, value: &str) -> Result<&Path> {
        self.context
            .toxworkdir
            .ok_or_else(|| Error::substitution(value, "{toxworkdir} is not known yet"))
    }

    fn env_name(&self, value: &str) -> Result<&str> {
        self.context.env_name.ok_or_else(|| {
            Error::substitution(value, "environment placeholders are only valid in environments")
        })
    }

    fn env_dir(&self, value: &str) -> Result<PathBuf> {
        Ok(self.work_dir(value)?.join(self.env_name(value)?))
    }
}

fn insert(
    value: &str,
    out: &mut String,
    shell: &mut ShellState,
    expansion: Expansion,
    mode: Mode,
) -> Result<()> {
    match (mode, expansion) {
        (_, Expansion::Fragment(text)) => {
            text.chars().for_each(|c| shell.feed(c));
            out.push_str(&text);
        }
        (Mode::Plain, Expansion::Value(text)) => out.push_str(&text),
        (Mode::Plain, Expansion::Words(words)) => out.push_str(&words.join(" ")),
        (Mode::Shell, Expansion::Words(words)) if !shell.is_quoted() => {
            let joined = shlex::try_join(words.iter().map(String::as_str)).map_err(|e| {
                Error::substitution(value, format!("positional arguments cannot be quoted: {e}"))
            })?;
            out.push_str(&joined);
        }
        (Mode::Shell, Expansion::Words(words)) => {
            out.push_str(&quote_in_context(value, shell, &words.join(" "))?)
        }
        (Mode::Shell, Expansion::Value(text)) => {
            out.push_str(&quote_in_context(value, shell, &text)?)
        }
    }
    Ok(())
}

/// Quote `text` for the shell position described by `shell`
fn quote_in_context(value: &str, shell: &ShellState, text: &str) -> Result<String> {
    match shell.quote {
        None if text.is_empty() => Ok(String::new()),
        None => shlex::try_quote(text)
            .map(|quoted| quoted.into_owned())
            .map_err(|e| Error::substitution(value, format!("'{text}' cannot be quoted: {e}"))),
        Some('\'') => Ok(text.replace('\'', r"'\''")),
        Some(_) => {
            let mut escaped = String::with_capacity(text.len());
            for c in text.chars() {
                if matches!(c, '"' | '\\' | '$' | '`') {
                    escaped.push('\\');
                }
                escaped.push(c);
            }
            Ok(escaped)
        }
    }
}

/// Byte offset of the `}` matching the `{` at `open`, honouring nesting and
/// escapes
fn matching_brace(value: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut escaped = false;

    for (offset, c) in value[open..].char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }

    None
}

fn path_list_separator() -> char {
    if cfg!(windows) {
        ';'
    } else {
        ':'
    }
}

fn bin_dir_name() -> &'static str {
    if cfg!(windows) {
        "Scripts"
    } else {
        "bin"
    }
}
