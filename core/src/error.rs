//! Error types for request orchestration
//!
//! Three outcomes are kept apart: cancellation ([`OrchestratorError::Aborted`],
//! reported through events only), transfer or HTTP failure (raised to the
//! caller), and misuse of the orchestrator itself.

use crate::request::Response;
use http::StatusCode;
use thiserror::Error;

/// Failure of the transfer itself, before any status code was received.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransferError {
    /// The cancellation token fired before the transfer settled
    #[error("Transfer aborted")]
    Aborted,

    /// Could not connect to the remote host
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The transport gave up waiting
    #[error("Transfer timed out: {0}")]
    Timeout(String),

    /// The request could not be built by the transport
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Any other network-level failure
    #[error("Network error: {0}")]
    Network(String),
}

/// A completed transfer whose status is not in the success range.
#[derive(Debug, Clone, Error)]
#[error("HTTP {}: {reason}", .status.as_u16())]
pub struct HttpError {
    /// Response status
    pub status: StatusCode,
    /// Reason phrase
    pub reason: String,
    /// The full response, body included
    pub response: Response,
}

impl HttpError {
    /// Build the failure value from a response.
    #[must_use]
    pub fn new(response: Response) -> Self {
        Self {
            status: response.status,
            reason: response.reason.clone(),
            response,
        }
    }
}

/// Errors surfaced by the orchestrator.
#[derive(Debug, Clone, Error)]
pub enum OrchestratorError {
    /// `initialize` was called a second time
    #[error("Cannot initialize the orchestrator, it is already initialized")]
    AlreadyInitialized,

    /// The target could not be resolved to an absolute URL
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        /// The target as given
        url: String,
        /// Parser error
        #[source]
        source: url::ParseError,
    },

    /// A configured header has an invalid name or value
    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader {
        /// Header name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// The request was canceled while in flight
    #[error("Request aborted")]
    Aborted,

    /// The server answered with a failure status
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The transfer failed
    #[error(transparent)]
    Transfer(TransferError),

    /// The response body is not a valid payload
    #[error("Response decoding failed: {0}")]
    Decode(String),
}

impl OrchestratorError {
    /// Whether this is the cancellation kind
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// HTTP status of an [`OrchestratorError::Http`] failure
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http(error) => Some(error.status),
            _ => None,
        }
    }
}

impl From<TransferError> for OrchestratorError {
    fn from(error: TransferError) -> Self {
        match error {
            TransferError::Aborted => Self::Aborted,
            other => Self::Transfer(other),
        }
    }
}
