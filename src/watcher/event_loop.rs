//! The blocking read-dispatch loop.

use crate::exec::Dispatcher;
use crate::template::CommandTemplate;

use super::error::WatchError;
use super::registry::WatchRegistry;
use super::service::{ChangeRecord, ReadOutcome, WatchService};

/// What a single loop iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// A modification record was handled; `n` commands were dispatched.
    Dispatched(usize),
    /// The record carried no modification flag.
    Ignored,
    /// Fewer bytes than a whole record were read.
    ShortRead,
}

/// Reads change records and runs the command for every matching target.
///
/// Holds the service, the registry built on it, the shared template and the
/// dispatcher. Runs until a fatal error.
pub struct EventLoop<S, D> {
    service: S,
    registry: WatchRegistry,
    template: CommandTemplate,
    dispatcher: D,
}

impl<S, D> EventLoop<S, D>
where
    S: WatchService,
    D: Dispatcher,
{
    pub fn new(service: S, registry: WatchRegistry, template: CommandTemplate, dispatcher: D) -> Self {
        Self {
            service,
            registry,
            template,
            dispatcher,
        }
    }

    pub fn registry(&self) -> &WatchRegistry {
        &self.registry
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Loop forever. Only returns on a fatal error.
    pub fn run(mut self) -> Result<(), WatchError> {
        if self.registry.is_empty() {
            tracing::warn!("[watcher] no targets registered, no command will ever run");
        }
        crate::log_event!("watcher", "started", "mode {}", self.dispatcher.mode());

        loop {
            self.step()?;
        }
    }

    /// Block for one change record and handle it.
    pub fn step(&mut self) -> Result<StepOutcome, WatchError> {
        let outcome = self
            .service
            .read_record()
            .map_err(|source| WatchError::ReadFailed { source })?;

        match outcome {
            ReadOutcome::Short { bytes } => {
                tracing::warn!("[watcher] read {bytes} bytes, less than one change record, discarding");
                Ok(StepOutcome::ShortRead)
            }
            ReadOutcome::Record(record) if record.is_modify() => self.on_modify(record),
            ReadOutcome::Record(record) => {
                crate::debug_event!("watcher", "ignored", "{} {:?}", record.handle, record.mask);
                Ok(StepOutcome::Ignored)
            }
        }
    }

    fn on_modify(&mut self, record: ChangeRecord) -> Result<StepOutcome, WatchError> {
        let mode = self.dispatcher.mode();
        let mut dispatched = 0;

        for target in self.registry.resolve(record.handle) {
            crate::debug_event!("watcher", "modified", "{}", target.path.display());

            let command = self.template.render(mode, &target.path);
            match self.dispatcher.dispatch(command) {
                Ok(()) => dispatched += 1,
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => tracing::error!(
                    "[exec] {}: {:#}",
                    target.path.display(),
                    anyhow::Error::new(e)
                ),
            }
        }

        if dispatched == 0 {
            crate::debug_event!("watcher", "no command dispatched", "{}", record.handle);
        }
        Ok(StepOutcome::Dispatched(dispatched))
    }
}
