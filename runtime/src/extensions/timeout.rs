//! Abort calls that take too long.
//!
//! On `start` a timer is armed for the call's `timeout` option (in
//! milliseconds) or, failing that, the extension's default. When it fires
//! before the transfer settles the call is aborted; the call then resolves
//! with an empty payload like any other abort.

use crate::extension::Extension;
use crate::orchestrator::Orchestrator;
use courier_core::{EventKind, LifecycleEvent, Options};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// Option holding the timeout in milliseconds
pub const TIMEOUT_OPTION: &str = "timeout";

/// Arms a timer against each call's cancellation token.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeoutExtension {
    default_timeout: Option<Duration>,
}

impl TimeoutExtension {
    /// Only calls setting `timeout` get a timer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            default_timeout: None,
        }
    }

    /// Calls without a `timeout` option get `timeout`
    #[must_use]
    pub const fn with_default(timeout: Duration) -> Self {
        Self {
            default_timeout: Some(timeout),
        }
    }

    fn timeout_for(&self, options: &Options) -> Option<Duration> {
        options
            .get(TIMEOUT_OPTION)
            .and_then(serde_json::Value::as_u64)
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .or(self.default_timeout)
    }
}

impl Extension for TimeoutExtension {
    fn initialize(&self, orchestrator: &Orchestrator) {
        let extension = *self;
        orchestrator.on(EventKind::Start, move |notification| {
            let LifecycleEvent::Start(start) = notification.event() else {
                return;
            };
            let Some(timeout) = extension.timeout_for(&start.operation.options) else {
                return;
            };
            let Ok(runtime) = Handle::try_current() else {
                warn!("no tokio runtime, request timeout not armed");
                return;
            };

            let id = start.operation.id;
            let token = start.abort.clone();
            let transfer = start.transfer.clone();
            runtime.spawn(async move {
                tokio::select! {
                    biased;
                    () = token.cancelled() => {}
                    _ = transfer => {}
                    () = tokio::time::sleep(timeout) => {
                        debug!(operation_id = %id, timeout_ms = timeout.as_millis(), "request timed out");
                        token.cancel();
                    }
                }
            });
        });
    }
}
