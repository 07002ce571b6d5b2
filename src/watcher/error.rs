//! Error types for the watch service, registry and event loop.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::exec::ExecError;

/// Errors from watcher operations.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to initialize watch service")]
    InitFailed {
        #[source]
        source: io::Error,
    },

    #[error("Cannot watch path {path}")]
    PathWatchFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read change record")]
    ReadFailed {
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Dispatch(#[from] ExecError),
}

impl WatchError {
    /// The underlying OS error code, if this error came from a system call.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            WatchError::InitFailed { source }
            | WatchError::PathWatchFailed { source, .. }
            | WatchError::ReadFailed { source } => source.raw_os_error(),
            WatchError::Dispatch(e) => e.raw_os_error(),
        }
    }

    /// Whether the event loop must stop on this error.
    ///
    /// A single target failing to register is recoverable; everything else is not.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, WatchError::PathWatchFailed { .. })
    }
}
