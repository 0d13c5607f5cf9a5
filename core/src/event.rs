//! Lifecycle events emitted by the orchestrator.
//!
//! Every request call that passes the `before` stage produces exactly one of
//! `abort`, `error` or `success`, always followed by exactly one `complete`:
//!
//! ```text
//! before ──canceled──▶ (nothing else)
//!    │
//!    ▼
//!  start ──▶ abort   ──┐
//!        ──▶ error   ──┼──▶ complete
//!        ──▶ success ──┘
//! ```
//!
//! Details are immutable; the [`Operation`] is shared by all events of one
//! call so observers can correlate them through [`Operation::id`].

use crate::error::OrchestratorError;
use crate::options::Options;
use crate::payload::Payload;
use crate::request::{Operation, Response};
use crate::transport::Transfer;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Name of a lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// The orchestrator was started
    Init,
    /// A request is about to be issued; cancelable
    Before,
    /// The transfer was issued
    Start,
    /// The transfer was canceled while in flight
    Abort,
    /// The transfer or decoding failed, or the status was not a success
    Error,
    /// The payload was decoded
    Success,
    /// The call finished, whatever the outcome
    Complete,
}

impl EventKind {
    /// All kinds in lifecycle order
    pub const ALL: [Self; 7] = [
        Self::Init,
        Self::Before,
        Self::Start,
        Self::Abort,
        Self::Error,
        Self::Success,
        Self::Complete,
    ];

    /// Event name as observers know it
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Before => "before",
            Self::Start => "start",
            Self::Abort => "abort",
            Self::Error => "error",
            Self::Success => "success",
            Self::Complete => "complete",
        }
    }

    /// Only `before` may be canceled
    #[must_use]
    pub const fn is_cancelable(self) -> bool {
        matches!(self, Self::Before)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detail of `init`.
#[derive(Debug, Clone)]
pub struct InitEvent {
    /// Process-wide defaults passed to `initialize`
    pub default_options: Options,
}

/// Detail of `before`.
///
/// Method, URL, data and options are reachable through the operation.
#[derive(Debug, Clone)]
pub struct BeforeEvent {
    /// The pending call
    pub operation: Arc<Operation>,
}

impl BeforeEvent {
    /// Target as a string
    #[must_use]
    pub fn url(&self) -> &str {
        self.operation.url().as_str()
    }
}

/// Detail of `start`.
#[derive(Debug, Clone)]
pub struct StartEvent {
    /// The call
    pub operation: Arc<Operation>,
    /// In-flight transfer
    pub transfer: Transfer,
    /// Cancellation handle of the transfer
    pub abort: CancellationToken,
}

/// Detail of `abort`.
#[derive(Debug, Clone)]
pub struct AbortEvent {
    /// The call
    pub operation: Arc<Operation>,
    /// Always the [`OrchestratorError::Aborted`] kind
    pub error: OrchestratorError,
}

/// Detail of `error`.
#[derive(Debug, Clone)]
pub struct ErrorEvent {
    /// The call
    pub operation: Arc<Operation>,
    /// The response, when one was received
    pub response: Option<Response>,
    /// What went wrong
    pub error: OrchestratorError,
}

/// Detail of `success`.
#[derive(Debug, Clone)]
pub struct SuccessEvent {
    /// The call
    pub operation: Arc<Operation>,
    /// The response
    pub response: Response,
    /// Decoded body
    pub payload: Payload,
}

/// Detail of `complete`.
#[derive(Debug, Clone)]
pub struct CompleteEvent {
    /// The call
    pub operation: Arc<Operation>,
    /// The response, when one was received
    pub response: Option<Response>,
    /// Decoded body, only on success
    pub payload: Option<Payload>,
    /// Failure or cancellation, absent on success
    pub error: Option<OrchestratorError>,
}

/// A lifecycle notification.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// See [`InitEvent`]
    Init(InitEvent),
    /// See [`BeforeEvent`]
    Before(BeforeEvent),
    /// See [`StartEvent`]
    Start(StartEvent),
    /// See [`AbortEvent`]
    Abort(AbortEvent),
    /// See [`ErrorEvent`]
    Error(ErrorEvent),
    /// See [`SuccessEvent`]
    Success(SuccessEvent),
    /// See [`CompleteEvent`]
    Complete(CompleteEvent),
}

impl LifecycleEvent {
    /// The event's name
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Init(_) => EventKind::Init,
            Self::Before(_) => EventKind::Before,
            Self::Start(_) => EventKind::Start,
            Self::Abort(_) => EventKind::Abort,
            Self::Error(_) => EventKind::Error,
            Self::Success(_) => EventKind::Success,
            Self::Complete(_) => EventKind::Complete,
        }
    }

    /// The call this event belongs to; `None` for `init`
    #[must_use]
    pub const fn operation(&self) -> Option<&Arc<Operation>> {
        match self {
            Self::Init(_) => None,
            Self::Before(detail) => Some(&detail.operation),
            Self::Start(detail) => Some(&detail.operation),
            Self::Abort(detail) => Some(&detail.operation),
            Self::Error(detail) => Some(&detail.operation),
            Self::Success(detail) => Some(&detail.operation),
            Self::Complete(detail) => Some(&detail.operation),
        }
    }

    /// Options of the call, or the defaults for `init`
    #[must_use]
    pub fn options(&self) -> &Options {
        match self {
            Self::Init(detail) => &detail.default_options,
            Self::Before(detail) => &detail.operation.options,
            Self::Start(detail) => &detail.operation.options,
            Self::Abort(detail) => &detail.operation.options,
            Self::Error(detail) => &detail.operation.options,
            Self::Success(detail) => &detail.operation.options,
            Self::Complete(detail) => &detail.operation.options,
        }
    }
}
