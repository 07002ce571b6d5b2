//! CLI module for the watcher.
//!
//! Provides command-line parsing and the mapping from errors to exit status.

pub mod args;

use std::io;

pub use args::{Cli, Invocation, SEPARATOR, SplitArgs, USAGE, UsageError, split_args};

/// Exit status for a fatal error.
///
/// The first OS error code found in the error chain is returned as-is
/// (truncated to a byte); anything else exits with 1.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    let os_code = err.chain().find_map(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .and_then(io::Error::raw_os_error)
    });

    match os_code {
        Some(code) if code & 0xff != 0 => (code & 0xff) as u8,
        _ => 1,
    }
}
