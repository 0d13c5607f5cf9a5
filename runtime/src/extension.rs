//! Extension contract.
//!
//! An extension is anything that needs a handle to the orchestrator once it
//! is running: usually to subscribe to lifecycle events.

use crate::orchestrator::Orchestrator;

/// Receives the orchestrator exactly once.
///
/// Extensions registered before [`Orchestrator::initialize`] are initialized
/// by it in registration order; extensions registered afterwards are
/// initialized on registration.
///
/// Closures taking `&Orchestrator` are extensions too:
///
/// ```
/// use courier_core::{EventKind, Options};
/// use courier_runtime::Orchestrator;
/// use courier_testing::MockTransport;
/// use std::sync::Arc;
///
/// let orchestrator = Orchestrator::new(Arc::new(MockTransport::new()));
/// orchestrator.register_extension(Arc::new(|orchestrator: &Orchestrator| {
///     orchestrator.on(EventKind::Before, |notification| {
///         tracing::info!(kind = %notification.kind(), "request starting");
///     });
/// }));
/// assert!(orchestrator.initialize(Options::new()).is_ok());
/// ```
pub trait Extension: Send + Sync {
    /// Attach to `orchestrator`
    fn initialize(&self, orchestrator: &Orchestrator);
}

impl<F> Extension for F
where
    F: Fn(&Orchestrator) + Send + Sync,
{
    fn initialize(&self, orchestrator: &Orchestrator) {
        self(orchestrator);
    }
}
