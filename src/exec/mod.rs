//! Dispatching rendered commands to the OS.
//!
//! The event loop only sees [`Dispatcher`]: hand over a [`RenderedCommand`]
//! and get control back. [`SpawnDispatcher`] starts the program and returns
//! at once; [`ShellDispatcher`] runs a command line through a shell and waits
//! for it.

use std::io;
use std::path::PathBuf;
use std::process::{Child, Command};

use thiserror::Error;

use crate::template::{ExecMode, RenderedCommand};

/// Errors from dispatching a command.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("Failed to spawn {program}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("A {expected} dispatcher cannot run a {got} command")]
    ModeMismatch { expected: ExecMode, got: ExecMode },

    #[error("Rendered command has no program")]
    EmptyCommand,
}

impl ExecError {
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            ExecError::Spawn { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }

    /// Whether the watcher has to stop.
    ///
    /// A missing or non-executable program only affects that one command.
    /// Running out of processes or memory affects every command after it.
    pub fn is_fatal(&self) -> bool {
        match self {
            ExecError::Spawn { source, .. } => matches!(
                source.raw_os_error(),
                Some(libc::EAGAIN) | Some(libc::ENOMEM)
            ),
            ExecError::ModeMismatch { .. } | ExecError::EmptyCommand => true,
        }
    }
}

/// Runs rendered commands.
pub trait Dispatcher {
    /// Which kind of [`RenderedCommand`] this dispatcher accepts.
    fn mode(&self) -> ExecMode;

    fn dispatch(&mut self, command: RenderedCommand<'_>) -> Result<(), ExecError>;
}

impl<D: Dispatcher + ?Sized> Dispatcher for Box<D> {
    fn mode(&self) -> ExecMode {
        (**self).mode()
    }

    fn dispatch(&mut self, command: RenderedCommand<'_>) -> Result<(), ExecError> {
        (**self).dispatch(command)
    }
}

/// Build the dispatcher for `mode`.
pub fn dispatcher_for(mode: ExecMode, shell: PathBuf) -> Box<dyn Dispatcher> {
    match mode {
        ExecMode::Exec => Box::new(SpawnDispatcher::new()),
        ExecMode::Shell => Box::new(ShellDispatcher::new(shell)),
    }
}

/// Fire-and-forget process spawning for argv commands.
///
/// Children are not waited for. Exited ones are reaped on the next dispatch
/// so they don't pile up as zombies.
#[derive(Debug, Default)]
pub struct SpawnDispatcher {
    running: Vec<Child>,
}

impl SpawnDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of children not yet known to have exited.
    pub fn running(&self) -> usize {
        self.running.len()
    }

    /// Collect exited children, returning how many were reaped.
    pub fn reap(&mut self) -> usize {
        let before = self.running.len();
        self.running.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                crate::debug_event!("exec", "exited", "pid {} {status}", child.id());
                false
            }
            Ok(None) => true,
            Err(e) => {
                tracing::warn!("[exec] cannot poll pid {}: {e}", child.id());
                false
            }
        });
        before - self.running.len()
    }
}

impl Dispatcher for SpawnDispatcher {
    fn mode(&self) -> ExecMode {
        ExecMode::Exec
    }

    fn dispatch(&mut self, command: RenderedCommand<'_>) -> Result<(), ExecError> {
        self.reap();

        let argv = command.argv().ok_or(ExecError::ModeMismatch {
            expected: ExecMode::Exec,
            got: command.mode(),
        })?;
        let (program, args) = argv.split_first().ok_or(ExecError::EmptyCommand)?;

        let child = Command::new(program)
            .args(args)
            .spawn()
            .map_err(|source| ExecError::Spawn {
                program: program.to_string_lossy().into_owned(),
                source,
            })?;

        crate::log_event!("exec", "spawned", "pid {} {command}", child.id());
        self.running.push(child);
        Ok(())
    }
}

/// Runs shell command lines as `<shell> -c <line>` and waits for them.
#[derive(Debug, Clone)]
pub struct ShellDispatcher {
    shell: PathBuf,
}

impl ShellDispatcher {
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    pub fn shell(&self) -> &std::path::Path {
        &self.shell
    }
}

impl Default for ShellDispatcher {
    fn default() -> Self {
        Self::new("/bin/sh")
    }
}

impl Dispatcher for ShellDispatcher {
    fn mode(&self) -> ExecMode {
        ExecMode::Shell
    }

    fn dispatch(&mut self, command: RenderedCommand<'_>) -> Result<(), ExecError> {
        let line = command.shell_line().ok_or(ExecError::ModeMismatch {
            expected: ExecMode::Shell,
            got: command.mode(),
        })?;

        crate::log_event!("exec", "running", "{command}");
        let status = Command::new(&self.shell)
            .arg("-c")
            .arg(line)
            .status()
            .map_err(|source| ExecError::Spawn {
                program: self.shell.display().to_string(),
                source,
            })?;

        if !status.success() {
            tracing::warn!("[exec] command {status}: {command}");
        }
        Ok(())
    }
}
