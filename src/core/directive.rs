// src/core/directive.rs

//! Turns a script's `#!` line into something the launcher can act on.

use crate::constants::INTERPRETER_FAMILY;
use crate::core::config_store::AliasTable;
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    // "/usr/bin/env python..." with any run of whitespace after `env`.
    static ref ENV_FORM_RE: Regex = Regex::new(r"^/usr/bin/env\s+(?P<command>python.*)$")
        .expect("env form pattern is valid");
}

/// Builtin interpreter paths that are resolved through the catalog rather than run.
const VIRTUAL_PATH_PREFIXES: [&str; 3] = ["/usr/bin/", "/usr/local/bin/", ""];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DirectiveError {
    #[error("Unknown virtual path '{0}'.")]
    BadVirtualPath(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    /// A builtin path such as `/usr/bin/env python3`; the command is `python...`.
    Virtual,
    /// The first token named a `[commands]` alias; the command is its value.
    Alias,
    /// Anything else: the command is run as written.
    Literal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub kind: DirectiveKind,
    pub command: String,
    pub suffix: Option<String>,
}

impl Directive {
    /// For a virtual directive, splits the command into the requested version text (what
    /// follows `python`) and the arguments after the first space.
    ///
    /// # Errors
    /// `BadVirtualPath` if the command does not start with `python`.
    pub fn virtual_target(&self) -> Result<(String, Option<String>), DirectiveError> {
        let (command, rest) = split_first_token(&self.command);
        let requested = command
            .strip_prefix(INTERPRETER_FAMILY)
            .ok_or_else(|| DirectiveError::BadVirtualPath(command.to_string()))?;
        Ok((requested.to_string(), non_empty(rest)))
    }
}

/// Interprets a decoded first line. Returns `None` unless the line is `#!` followed by
/// something other than whitespace.
///
/// Builtin paths are checked first; only then is the first token looked up as an
/// alias. Anything else is run as written.
pub fn interpret(line: &str, aliases: &AliasTable) -> Option<Directive> {
    let body = line.strip_prefix("#!")?.trim_start().trim_end();
    if body.is_empty() {
        return None;
    }

    if let Some(command) = virtual_command(body) {
        return Some(Directive {
            kind: DirectiveKind::Virtual,
            command: command.to_string(),
            suffix: None,
        });
    }

    let (token, rest) = split_first_token(body);
    if let Some(alias) = aliases.find(token) {
        log::debug!("Shebang command '{}' is an alias for '{}'", token, alias.command);
        return Some(Directive {
            kind: DirectiveKind::Alias,
            command: alias.command.clone(),
            suffix: non_empty(rest),
        });
    }

    Some(Directive {
        kind: DirectiveKind::Literal,
        command: body.to_string(),
        suffix: None,
    })
}

fn virtual_command(body: &str) -> Option<&str> {
    if let Some(caps) = ENV_FORM_RE.captures(body) {
        return caps.name("command").map(|m| m.as_str());
    }
    VIRTUAL_PATH_PREFIXES.iter().find_map(|prefix| {
        body.strip_prefix(prefix)
            .filter(|rest| rest.starts_with(INTERPRETER_FAMILY))
    })
}

fn split_first_token(text: &str) -> (&str, &str) {
    match text.find(char::is_whitespace) {
        Some(at) => text.split_at(at),
        None => (text, ""),
    }
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

// MARK: --- UNIT TESTS ---
