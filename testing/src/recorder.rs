//! Lifecycle event recorder.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity

use courier_core::{EventKind, LifecycleBus, LifecycleEvent, OperationId};
use std::sync::{Arc, Mutex};

/// Records every lifecycle event dispatched on a bus.
///
/// # Example
///
/// ```
/// use courier_core::{EventKind, InitEvent, LifecycleBus, LifecycleEvent, Options};
/// use courier_testing::EventRecorder;
///
/// let bus = LifecycleBus::new();
/// let recorder = EventRecorder::attach(&bus);
///
/// bus.dispatch(&LifecycleEvent::Init(InitEvent { default_options: Options::new() }));
/// assert_eq!(recorder.kinds(), vec![EventKind::Init]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<LifecycleEvent>>>,
}

impl EventRecorder {
    /// Subscribe a new recorder to every event kind of `bus`
    #[must_use]
    pub fn attach(bus: &LifecycleBus) -> Self {
        let recorder = Self::default();
        for kind in EventKind::ALL {
            let events = Arc::clone(&recorder.events);
            bus.subscribe(kind, move |notification| {
                events.lock().unwrap().push(notification.event().clone());
            });
        }
        recorder
    }

    /// Recorded events in dispatch order
    #[must_use]
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Recorded event kinds in dispatch order
    #[must_use]
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().unwrap().iter().map(LifecycleEvent::kind).collect()
    }

    /// Kinds recorded for one call, in dispatch order
    #[must_use]
    pub fn kinds_for(&self, id: OperationId) -> Vec<EventKind> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.operation().is_some_and(|operation| operation.id == id))
            .map(LifecycleEvent::kind)
            .collect()
    }

    /// Distinct operation ids in order of first appearance
    #[must_use]
    pub fn operations(&self) -> Vec<OperationId> {
        let mut ids = Vec::new();
        for event in self.events.lock().unwrap().iter() {
            if let Some(operation) = event.operation() {
                if !ids.contains(&operation.id) {
                    ids.push(operation.id);
                }
            }
        }
        ids
    }

    /// Number of recorded events of `kind`
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.kind() == kind)
            .count()
    }

    /// Last recorded event of `kind`
    #[must_use]
    pub fn last(&self, kind: EventKind) -> Option<LifecycleEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|event| event.kind() == kind)
            .cloned()
    }

    /// Forget everything recorded so far
    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}
