//! Typed publish/subscribe for lifecycle events.
//!
//! The [`LifecycleBus`] maps each [`EventKind`] to an ordered list of
//! listeners. Publishing delivers an immutable [`LifecycleEvent`] to every
//! listener of its kind, in subscription order.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   dispatch(event)   ┌───────────────────────────┐
//! │ Orchestrator │ ──────────────────▶ │ LifecycleBus              │
//! └──────────────┘                     │  before → [l1, l2, ...]   │
//!        ▲                             │  start  → [l3, ...]       │
//!        │   false if canceled         │  ...                      │
//!        └──────────────────────────── └───────────────────────────┘
//! ```
//!
//! # Cancellation
//!
//! Listeners of a cancelable event (`before`) may call
//! [`Notification::cancel`]. The flag is checked once, after every listener
//! has run; later listeners still see the event and can inspect
//! [`Notification::is_canceled`].
//!
//! # Example
//!
//! ```
//! use courier_core::event::EventKind;
//! use courier_core::event_bus::LifecycleBus;
//!
//! let bus = LifecycleBus::new();
//! let id = bus.subscribe(EventKind::Before, |notification| {
//!     if notification.event().options().flag("skip") == Some(true) {
//!         notification.cancel();
//!     }
//! });
//!
//! assert_eq!(bus.listener_count(EventKind::Before), 1);
//! assert!(bus.unsubscribe(id));
//! ```

use crate::event::{EventKind, LifecycleEvent};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// A subscribed callback.
pub type Listener = Arc<dyn Fn(&Notification<'_>) + Send + Sync>;

/// Handle returned by [`LifecycleBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// What a listener receives.
pub struct Notification<'a> {
    event: &'a LifecycleEvent,
    canceled: &'a AtomicBool,
}

impl Notification<'_> {
    /// The event being delivered
    #[must_use]
    pub const fn event(&self) -> &LifecycleEvent {
        self.event
    }

    /// Shortcut for `event().kind()`
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.event.kind()
    }

    /// Signal cancellation; ignored for events that are not cancelable.
    pub fn cancel(&self) {
        if self.kind().is_cancelable() {
            self.canceled.store(true, Ordering::SeqCst);
        } else {
            tracing::debug!(event = %self.kind(), "ignoring cancel of non-cancelable event");
        }
    }

    /// Whether an earlier listener canceled the event
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct BusState {
    next_id: u64,
    listeners: BTreeMap<EventKind, Vec<(SubscriptionId, Listener)>>,
}

/// Registry of lifecycle listeners.
///
/// Cloning yields another handle to the same registry. Listeners are invoked
/// outside the internal lock, so they may subscribe or unsubscribe freely;
/// changes take effect from the next dispatch.
#[derive(Clone, Default)]
pub struct LifecycleBus {
    state: Arc<RwLock<BusState>>,
}

impl LifecycleBus {
    /// Create an empty bus
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `listener` for events of `kind`, after existing ones.
    pub fn subscribe<F>(&self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&Notification<'_>) + Send + Sync + 'static,
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.next_id += 1;
        let id = SubscriptionId(state.next_id);
        state
            .listeners
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        for listeners in state.listeners.values_mut() {
            if let Some(position) = listeners.iter().position(|(existing, _)| *existing == id) {
                listeners.remove(position);
                return true;
            }
        }
        false
    }

    /// Number of listeners for `kind`
    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.listeners.get(&kind).map_or(0, Vec::len)
    }

    /// Deliver `event` to its listeners.
    ///
    /// Returns `false` when the event is cancelable and a listener canceled
    /// it, `true` otherwise.
    pub fn dispatch(&self, event: &LifecycleEvent) -> bool {
        let kind = event.kind();
        let listeners: Vec<Listener> = {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            state
                .listeners
                .get(&kind)
                .map(|listeners| listeners.iter().map(|(_, l)| Arc::clone(l)).collect())
                .unwrap_or_default()
        };

        let canceled = AtomicBool::new(false);
        let notification = Notification {
            event,
            canceled: &canceled,
        };
        for listener in &listeners {
            listener(&notification);
        }

        let canceled = canceled.load(Ordering::SeqCst);
        tracing::trace!(event = %kind, listeners = listeners.len(), canceled, "dispatched");
        !canceled
    }
}

impl fmt::Debug for LifecycleBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let counts: BTreeMap<EventKind, usize> = state
            .listeners
            .iter()
            .map(|(kind, listeners)| (*kind, listeners.len()))
            .collect();
        f.debug_struct("LifecycleBus")
            .field("listeners", &counts)
            .finish()
    }
}
