//! File watching and the event-to-command loop.
//!
//! # Architecture
//!
//! ```text
//! WatchService (inotify fd)
//!   - add_watch(path)  -> WatchHandle
//!   - read_record()    -> ChangeRecord { handle, mask }
//!         |
//! WatchRegistry
//!   - handle -> [WatchTarget { index, path }]
//!         |
//! EventLoop
//!   - on MODIFY: render CommandTemplate for each target
//!   - hand the RenderedCommand to a Dispatcher
//! ```

mod error;
mod event_loop;
mod registry;
mod service;

pub use error::WatchError;
pub use event_loop::{EventLoop, StepOutcome};
pub use registry::{WatchRegistry, WatchTarget};
pub use service::{
    ChangeMask, ChangeRecord, InotifyService, RECORD_HEADER_LEN, ReadOutcome, WATCH_MASK,
    WatchHandle, WatchService, decode_record,
};
