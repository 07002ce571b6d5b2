//! Command-line parsing.
//!
//! The raw arguments are first split on the first `--`: everything before it
//! is parsed by clap (options and the paths to watch), everything after it is
//! the command template, taken verbatim.

use clap::{
    ArgAction, Parser,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::ffi::OsString;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::Settings;
use crate::logging::verbosity_level;
use crate::template::ExecMode;

/// Token separating the watched files from the command.
pub const SEPARATOR: &str = "--";

pub const USAGE: &str = "wf [OPTIONS] <PATH>... -- <COMMAND>...";

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

const AFTER_HELP: &str = "\
Substitutions in the command:
  %F    path of the file that was modified
  %%    a literal %

Files whose names start with `-` are read as options; name them as
`./-name` instead.

Examples:
  $ wf src/main.c src/util.c -- make
  $ wf notes.md -- pandoc %F -o %F.html
  $ wf --shell config.toml -- echo %F changed >> changes.log";

/// Watch files and run a command each time one of them is modified.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "wf",
    version,
    about = "Watch files and run a command each time one of them is modified",
    override_usage = USAGE,
    after_help = AFTER_HELP,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Files to watch
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Run the command through a shell instead of spawning it directly
    #[arg(long)]
    pub shell: bool,

    /// Configuration file (defaults to the nearest .wf/settings.toml)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Apply command-line overrides on top of loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        if self.shell {
            settings.exec.mode = ExecMode::Shell;
        }
        if let Some(level) = verbosity_level(self.verbose) {
            settings.logging.default = level.to_string();
        }
    }
}

/// Errors in how the program was invoked.
#[derive(Error, Debug)]
pub enum UsageError {
    #[error("no arguments given")]
    NoArguments,

    #[error("missing `--` between the files to watch and the command")]
    MissingSeparator,

    #[error("no command given after `--`")]
    EmptyCommand,

    #[error(transparent)]
    Clap(#[from] clap::Error),
}

impl UsageError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            // -1 as an exit status
            UsageError::NoArguments => 255,
            UsageError::Clap(e) => u8::try_from(e.exit_code()).unwrap_or(2),
            UsageError::MissingSeparator | UsageError::EmptyCommand => 2,
        }
    }
}

/// Arguments divided at the first `--`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitArgs {
    /// Tokens before the separator.
    pub targets: Vec<OsString>,
    /// Tokens after the separator.
    pub command: Vec<OsString>,
    /// Whether a separator was seen at all.
    pub separated: bool,
}

/// Split arguments (program name excluded) at the first `--`.
///
/// The first `--` itself is dropped; later ones belong to the command.
pub fn split_args<I, T>(args: I) -> SplitArgs
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut split = SplitArgs::default();

    for arg in args {
        let arg = arg.into();
        if split.separated {
            split.command.push(arg);
        } else if arg == SEPARATOR {
            split.separated = true;
        } else {
            split.targets.push(arg);
        }
    }

    split
}

/// A fully parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub cli: Cli,
    pub command: Vec<OsString>,
}

impl Invocation {
    /// Parse `args`, the first of which is the program name.
    pub fn parse_from<I, T>(args: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let mut args = args.into_iter().map(Into::into);
        let program = args.next().unwrap_or_else(|| OsString::from("wf"));

        let split = split_args(args);
        if split.targets.is_empty() && !split.separated {
            return Err(UsageError::NoArguments);
        }

        // Parsed before the separator check so `wf --help` works.
        let cli = Cli::try_parse_from(std::iter::once(program).chain(split.targets))?;

        if !split.separated {
            return Err(UsageError::MissingSeparator);
        }
        if split.command.is_empty() {
            return Err(UsageError::EmptyCommand);
        }

        Ok(Self {
            cli,
            command: split.command,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os(items: &[&str]) -> Vec<OsString> {
        items.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_split_basic() {
        let split = split_args(["a.txt", "b.txt", "--", "echo", "%F"]);
        assert_eq!(split.targets, os(&["a.txt", "b.txt"]));
        assert_eq!(split.command, os(&["echo", "%F"]));
        assert!(split.separated);
    }

    #[test]
    fn test_split_keeps_later_separators() {
        let split = split_args(["a", "--", "git", "diff", "--", "%F"]);
        assert_eq!(split.targets, os(&["a"]));
        assert_eq!(split.command, os(&["git", "diff", "--", "%F"]));
    }

    #[test]
    fn test_split_without_separator() {
        let split = split_args(["a", "b"]);
        assert_eq!(split.targets, os(&["a", "b"]));
        assert!(split.command.is_empty());
        assert!(!split.separated);
    }

    #[test]
    fn test_split_empty_sides() {
        let split = split_args(["--"]);
        assert!(split.targets.is_empty());
        assert!(split.command.is_empty());
        assert!(split.separated);
    }

    #[test]
    fn test_invocation_parse() {
        let inv = Invocation::parse_from(["wf", "-v", "--shell", "a.txt", "b.txt", "--", "cat", "%F"])
            .unwrap();
        assert_eq!(
            inv.cli.paths,
            vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]
        );
        assert!(inv.cli.shell);
        assert_eq!(inv.cli.verbose, 1);
        assert_eq!(inv.command, os(&["cat", "%F"]));
    }

    #[test]
    fn test_invocation_command_flags_untouched() {
        let inv = Invocation::parse_from(["wf", "a.txt", "--", "ls", "-l", "--shell", "%F"]).unwrap();
        assert!(!inv.cli.shell);
        assert_eq!(inv.command, os(&["ls", "-l", "--shell", "%F"]));
    }

    #[test]
    fn test_dash_file_needs_dot_slash() {
        let inv = Invocation::parse_from(["wf", "./-v", "--", "cat", "%F"]).unwrap();
        assert_eq!(inv.cli.paths, vec![PathBuf::from("./-v")]);
        assert_eq!(inv.cli.verbose, 0);

        let inv = Invocation::parse_from(["wf", "-v", "--", "cat", "%F"]).unwrap();
        assert!(inv.cli.paths.is_empty());
        assert_eq!(inv.cli.verbose, 1);
    }

    #[test]
    fn test_invocation_no_targets_is_allowed() {
        let inv = Invocation::parse_from(["wf", "--", "true"]).unwrap();
        assert!(inv.cli.paths.is_empty());
    }

    #[test]
    fn test_invocation_errors() {
        let err = Invocation::parse_from(["wf"]).unwrap_err();
        assert!(matches!(err, UsageError::NoArguments));
        assert_eq!(err.exit_code(), 255);

        let err = Invocation::parse_from(["wf", "a.txt"]).unwrap_err();
        assert!(matches!(err, UsageError::MissingSeparator));
        assert_eq!(err.exit_code(), 2);

        let err = Invocation::parse_from(["wf", "a.txt", "--"]).unwrap_err();
        assert!(matches!(err, UsageError::EmptyCommand));

        let err = Invocation::parse_from(["wf", "--bogus", "a", "--", "x"]).unwrap_err();
        assert!(matches!(err, UsageError::Clap(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_help_is_reported_through_clap() {
        let err = Invocation::parse_from(["wf", "--help"]).unwrap_err();
        match err {
            UsageError::Clap(e) => assert_eq!(e.kind(), clap::error::ErrorKind::DisplayHelp),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_apply_overrides() {
        let inv = Invocation::parse_from(["wf", "-vv", "--shell", "a", "--", "x"]).unwrap();
        let mut settings = Settings::default();
        inv.cli.apply(&mut settings);
        assert_eq!(settings.exec.mode, ExecMode::Shell);
        assert_eq!(settings.logging.default, "debug");
    }
}
