//! Watch registry mapping service handles back to the paths the user asked for.
//!
//! Every requested path gets a slot, in command-line order. Slots of paths that
//! failed to register stay empty and are never matched. Lookup by handle goes
//! through a map so each event resolves without rescanning the targets.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::error::WatchError;
use super::service::{WATCH_MASK, WatchHandle, WatchService};

/// A successfully registered path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    /// Position of the path among the requested targets.
    pub index: usize,
    pub path: PathBuf,
    pub handle: WatchHandle,
}

/// Registry of watched files.
#[derive(Debug, Default)]
pub struct WatchRegistry {
    /// One slot per requested path; `None` where registration failed.
    slots: Vec<Option<WatchTarget>>,
    /// handle -> slot indices. Several paths may share one handle
    /// (e.g. the same file named twice).
    by_handle: HashMap<WatchHandle, Vec<usize>>,
}

impl WatchRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every path, logging and skipping the ones that fail.
    pub fn register_all<S, I, P>(service: &mut S, paths: I) -> Self
    where
        S: WatchService + ?Sized,
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut registry = Self::new();

        for path in paths {
            if let Err(e) = registry.register(service, path) {
                tracing::warn!("[watcher] {:#}, skipping", anyhow::Error::new(e));
            }
        }

        let requested = registry.requested_count();
        let active = registry.active_count();
        if active == 0 && requested > 0 {
            tracing::warn!("[watcher] none of the {requested} targets could be watched");
        } else {
            crate::log_event!("watcher", "watching", "{active} of {requested} targets");
        }

        registry
    }

    /// Ask the service to monitor `path` and record the result.
    ///
    /// A slot is taken either way, so target indices follow the order paths
    /// were requested in.
    pub fn register<S>(
        &mut self,
        service: &mut S,
        path: impl Into<PathBuf>,
    ) -> Result<WatchHandle, WatchError>
    where
        S: WatchService + ?Sized,
    {
        let path = path.into();
        let index = self.slots.len();

        match service.add_watch(&path, WATCH_MASK) {
            Ok(handle) => {
                crate::debug_event!("watcher", "registered", "{} as {handle}", path.display());
                self.by_handle.entry(handle).or_default().push(index);
                self.slots.push(Some(WatchTarget {
                    index,
                    path,
                    handle,
                }));
                Ok(handle)
            }
            Err(source) => {
                self.slots.push(None);
                Err(WatchError::PathWatchFailed { path, source })
            }
        }
    }

    /// Every registered target watched through `handle`, in request order.
    pub fn resolve(&self, handle: WatchHandle) -> impl Iterator<Item = &WatchTarget> + '_ {
        self.by_handle
            .get(&handle)
            .into_iter()
            .flatten()
            .filter_map(|&index| self.slots.get(index).and_then(Option::as_ref))
    }

    /// Look up a target by the path it was requested with.
    pub fn find(&self, path: &Path) -> Option<&WatchTarget> {
        self.targets().find(|t| t.path == path)
    }

    /// All registered targets, in request order.
    pub fn targets(&self) -> impl Iterator<Item = &WatchTarget> {
        self.slots.iter().flatten()
    }

    /// Number of paths that were requested.
    pub fn requested_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of paths that are actually being watched.
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.by_handle.is_empty()
    }
}
