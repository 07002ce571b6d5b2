//! Watch files and run a command, with the changed file's path substituted
//! in, every time one of them is modified.
//!
//! ```text
//! wf a.txt b.txt -- echo %F changed
//! ```

pub mod cli;
pub mod config;
pub mod exec;
pub mod logging;
pub mod template;
pub mod watcher;

pub use config::Settings;
pub use exec::{Dispatcher, ExecError, ShellDispatcher, SpawnDispatcher};
pub use template::{CommandTemplate, ExecMode, RenderedCommand, TemplateError};
pub use watcher::{EventLoop, InotifyService, WatchError, WatchHandle, WatchRegistry, WatchService};
