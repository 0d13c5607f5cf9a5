//! Mapping of `reqwest` failures onto transfer errors

use courier_core::TransferError;
use thiserror::Error;

/// Errors raised while building a [`ReqwestTransport`](crate::ReqwestTransport)
#[derive(Debug, Error)]
pub enum TransportBuildError {
    /// The underlying client could not be built (TLS backend, invalid user agent)
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Classify a `reqwest` error.
#[must_use]
pub fn classify(error: &reqwest::Error) -> TransferError {
    if error.is_connect() {
        TransferError::Connect(error.to_string())
    } else if error.is_timeout() {
        TransferError::Timeout(error.to_string())
    } else if error.is_builder() {
        TransferError::InvalidRequest(error.to_string())
    } else {
        TransferError::Network(error.to_string())
    }
}
