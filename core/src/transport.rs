//! The transport seam and the in-flight transfer handle.
//!
//! The orchestrator never talks to the network itself: it hands a built
//! [`Request`] to a [`Transport`] and exposes the resulting [`Transfer`] to
//! observers of the `start` event.

use crate::error::TransferError;
use crate::request::{Request, Response};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Result of a transfer.
pub type TransferResult = Result<Response, TransferError>;

/// Performs HTTP transfers.
///
/// Implementations buffer the whole response body. They may watch
/// `request.signal` themselves; the orchestrator also races the returned
/// future against it, so a transport that ignores the signal is still
/// aborted promptly.
///
/// # Dyn Compatibility
///
/// Returns a boxed future instead of using `async fn` so the orchestrator
/// can hold an `Arc<dyn Transport>`.
pub trait Transport: Send + Sync {
    /// Send `request` and buffer the response.
    fn send(&self, request: Request) -> BoxFuture<'static, TransferResult>;
}

/// Handle to an in-flight transfer.
///
/// Cloneable; every clone resolves to the same result. Resolves to
/// [`TransferError::Aborted`] when the request's cancellation token fires
/// before the transport settles.
#[derive(Clone)]
pub struct Transfer {
    inner: Shared<BoxFuture<'static, TransferResult>>,
}

impl Transfer {
    /// Issue `request` on `transport`, bound to the request's signal.
    #[must_use]
    pub fn start(transport: &dyn Transport, request: Request) -> Self {
        let signal = request.signal.clone();
        let send = transport.send(request);

        let raced = async move {
            tokio::select! {
                biased;
                () = signal.cancelled() => Err(TransferError::Aborted),
                result = send => result,
            }
        };

        Self {
            inner: raced.boxed().shared(),
        }
    }

    /// The result, if the transfer has already settled
    #[must_use]
    pub fn peek(&self) -> Option<&TransferResult> {
        self.inner.peek()
    }

    /// Whether the transfer has settled
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.peek().is_some()
    }
}

impl Future for Transfer {
    type Output = TransferResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx)
    }
}

impl fmt::Debug for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transfer")
            .field("settled", &self.is_settled())
            .finish()
    }
}
