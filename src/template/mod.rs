//! Command templates and their per-event rendering.
//!
//! A [`CommandTemplate`] is the token list given after `--`. For every file
//! that changes it is rendered into a [`RenderedCommand`], either as an argv
//! vector ([`ExecMode::Exec`]) or as one shell command line
//! ([`ExecMode::Shell`]).
//!
//! # Shell mode quoting
//!
//! In shell mode every expanded token is wrapped in double quotes and followed
//! by a space. The quotes are not escaped: a path or argument that contains
//! `"`, `$` or a backtick is interpreted by the shell. Use exec mode for
//! untrusted file names.

mod expand;

use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use expand::{ESCAPE, Expansion, FILE_ESCAPE, UnknownEscape, expand_token};

/// Errors building a command template.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Command template is empty")]
    Empty,
}

/// How a rendered command is handed to the OS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecMode {
    /// Spawn the program directly with an argument vector.
    #[default]
    Exec,
    /// Quote the tokens into one line and run it through a shell.
    Shell,
}

impl fmt::Display for ExecMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecMode::Exec => write!(f, "exec"),
            ExecMode::Shell => write!(f, "shell"),
        }
    }
}

/// The command tokens given after `--`, shared by every invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    tokens: Vec<OsString>,
}

impl CommandTemplate {
    pub fn new<I, T>(tokens: I) -> Result<Self, TemplateError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let tokens: Vec<OsString> = tokens.into_iter().map(Into::into).collect();
        if tokens.is_empty() {
            return Err(TemplateError::Empty);
        }
        Ok(Self { tokens })
    }

    pub fn tokens(&self) -> &[OsString] {
        &self.tokens
    }

    /// First token, the program to run in exec mode.
    pub fn program(&self) -> &OsStr {
        &self.tokens[0]
    }

    /// Whether any token contains an escape at all.
    pub fn has_substitutions(&self) -> bool {
        self.tokens.iter().any(|t| t.as_bytes().contains(&ESCAPE))
    }

    pub fn render(&self, mode: ExecMode, path: &Path) -> RenderedCommand<'_> {
        match mode {
            ExecMode::Exec => self.render_argv(path),
            ExecMode::Shell => self.render_shell_line(path),
        }
    }

    /// One output argument per token, no shell involved.
    pub fn render_argv(&self, path: &Path) -> RenderedCommand<'_> {
        let argv = self
            .tokens
            .iter()
            .map(|token| expand_reported(token, path).value)
            .collect();
        RenderedCommand::Argv(argv)
    }

    /// `"tok1" "tok2" ...` with escapes expanded, for `sh -c`.
    pub fn render_shell_line(&self, path: &Path) -> RenderedCommand<'_> {
        let mut line = Vec::new();
        for token in &self.tokens {
            let expansion = expand_reported(token, path);
            line.push(b'"');
            line.extend_from_slice(expansion.value.as_bytes());
            line.extend_from_slice(b"\" ");
        }
        RenderedCommand::ShellLine(OsString::from_vec(line))
    }
}

/// Expand a token and log every unknown escape found in it.
fn expand_reported<'a>(token: &'a OsStr, path: &Path) -> Expansion<'a> {
    let expansion = expand_token(token, path);
    for escape in &expansion.unknown {
        tracing::warn!(
            "[template] unknown substitution {escape} in {:?}, skipping",
            token.to_string_lossy()
        );
    }
    expansion
}

/// A command ready to run for one triggering file.
///
/// Unchanged tokens borrow from the template; only expanded ones are owned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedCommand<'t> {
    Argv(Vec<Cow<'t, OsStr>>),
    ShellLine(OsString),
}

impl RenderedCommand<'_> {
    pub fn mode(&self) -> ExecMode {
        match self {
            RenderedCommand::Argv(_) => ExecMode::Exec,
            RenderedCommand::ShellLine(_) => ExecMode::Shell,
        }
    }

    /// The argument vector, if this is an exec-mode command.
    pub fn argv(&self) -> Option<&[Cow<'_, OsStr>]> {
        match self {
            RenderedCommand::Argv(argv) => Some(argv.as_slice()),
            RenderedCommand::ShellLine(_) => None,
        }
    }

    /// The command line, if this is a shell-mode command.
    pub fn shell_line(&self) -> Option<&OsStr> {
        match self {
            RenderedCommand::Argv(_) => None,
            RenderedCommand::ShellLine(line) => Some(line.as_os_str()),
        }
    }
}

impl fmt::Display for RenderedCommand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderedCommand::Argv(argv) => {
                let args: Vec<_> = argv.iter().map(|a| a.to_string_lossy()).collect();
                write!(f, "{args:?}")
            }
            RenderedCommand::ShellLine(line) => write!(f, "{}", line.to_string_lossy()),
        }
    }
}
