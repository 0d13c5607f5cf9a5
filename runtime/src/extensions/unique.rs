//! At most one in-flight call per key.
//!
//! The `unique` option selects the key:
//!
//! | `unique` | Key |
//! |---|---|
//! | absent or `true` | `"default"` |
//! | a string | that string |
//! | `false` | none, the call is not tracked |
//!
//! When a call starts, the previous in-flight call with the same key is
//! aborted. The earlier call then resolves with an empty payload.

use super::InFlight;
use crate::extension::Extension;
use crate::orchestrator::Orchestrator;
use courier_core::{EventKind, LifecycleEvent, Options};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Option selecting the key
pub const UNIQUE_OPTION: &str = "unique";

/// Key used when `unique` is absent or `true`
pub const DEFAULT_KEY: &str = "default";

/// Aborts the previous in-flight call sharing a key.
#[derive(Debug, Clone)]
pub struct UniqueExtension {
    in_flight: Arc<InFlight<String>>,
}

impl UniqueExtension {
    /// New extension tracking nothing
    #[must_use]
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(InFlight::new()),
        }
    }

    /// Number of keys with an in-flight call
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

impl Default for UniqueExtension {
    fn default() -> Self {
        Self::new()
    }
}

fn unique_key(options: &Options) -> Option<String> {
    match options.get(UNIQUE_OPTION) {
        Some(Value::Bool(false)) => None,
        Some(Value::String(key)) => Some(key.clone()),
        _ => Some(DEFAULT_KEY.to_string()),
    }
}

impl Extension for UniqueExtension {
    fn initialize(&self, orchestrator: &Orchestrator) {
        let in_flight = Arc::clone(&self.in_flight);
        orchestrator.on(EventKind::Start, move |notification| {
            let LifecycleEvent::Start(start) = notification.event() else {
                return;
            };
            let Some(key) = unique_key(&start.operation.options) else {
                return;
            };

            let previous = in_flight.insert(key.clone(), start.operation.id, start.abort.clone());
            if let Some((previous_id, token)) = previous {
                if previous_id != start.operation.id {
                    debug!(
                        key = %key,
                        aborted = %previous_id,
                        operation_id = %start.operation.id,
                        "aborting superseded request"
                    );
                    token.cancel();
                }
            }
        });

        let in_flight = Arc::clone(&self.in_flight);
        orchestrator.on(EventKind::Complete, move |notification| {
            let LifecycleEvent::Complete(complete) = notification.event() else {
                return;
            };
            if let Some(key) = unique_key(&complete.operation.options) {
                in_flight.remove_if(&key, complete.operation.id);
            }
        });
    }
}
