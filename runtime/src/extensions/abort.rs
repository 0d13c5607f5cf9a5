//! Abort every in-flight call at once.
//!
//! Calls setting `abort = false` are not tracked and survive
//! [`AbortExtension::abort_all`].

use super::InFlight;
use crate::extension::Extension;
use crate::orchestrator::Orchestrator;
use courier_core::{EventKind, LifecycleEvent, OperationId};
use std::sync::Arc;
use tracing::info;

/// Option opting a call out of `abort_all`
pub const ABORT_OPTION: &str = "abort";

/// Tracks abortable in-flight calls.
///
/// Clones share their state, so keep one clone to call
/// [`abort_all`](Self::abort_all) after registering the other.
#[derive(Debug, Clone)]
pub struct AbortExtension {
    in_flight: Arc<InFlight<OperationId>>,
}

impl AbortExtension {
    /// New extension tracking nothing
    #[must_use]
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(InFlight::new()),
        }
    }

    /// Abort every tracked call; returns how many were aborted.
    pub fn abort_all(&self) -> usize {
        let aborted = self.in_flight.drain();
        for (_, token) in &aborted {
            token.cancel();
        }
        if !aborted.is_empty() {
            info!(count = aborted.len(), "aborted in-flight requests");
        }
        aborted.len()
    }

    /// Number of tracked calls
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

impl Default for AbortExtension {
    fn default() -> Self {
        Self::new()
    }
}

impl Extension for AbortExtension {
    fn initialize(&self, orchestrator: &Orchestrator) {
        let in_flight = Arc::clone(&self.in_flight);
        orchestrator.on(EventKind::Start, move |notification| {
            let LifecycleEvent::Start(start) = notification.event() else {
                return;
            };
            if start.operation.options.flag(ABORT_OPTION) != Some(false) {
                in_flight.insert(start.operation.id, start.operation.id, start.abort.clone());
            }
        });

        let in_flight = Arc::clone(&self.in_flight);
        orchestrator.on(EventKind::Complete, move |notification| {
            if let LifecycleEvent::Complete(complete) = notification.event() {
                in_flight.remove_if(&complete.operation.id, complete.operation.id);
            }
        });
    }
}
