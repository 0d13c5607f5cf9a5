//! Outgoing requests, buffered responses and the per-call operation record.

use crate::data::{Body, RequestData};
use crate::options::{Credentials, Options};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

/// Header telling the server the request was issued programmatically.
pub const REQUESTED_WITH_HEADER: &str = "x-requested-with";

/// Value of [`REQUESTED_WITH_HEADER`].
pub const REQUESTED_WITH_VALUE: &str = "XMLHttpRequest";

/// Unique identifier of one `make_request` call.
///
/// Every lifecycle event of the call carries the same id, which lets
/// observers correlate interleaved calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(Uuid);

impl OperationId {
    /// Generate a new operation ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The request handed to the transport.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method
    pub method: Method,
    /// Absolute target, query already extended for GET/HEAD data
    pub url: Url,
    /// Headers, always including the programmatic-request marker
    pub headers: HeaderMap,
    /// Body computed by the transformer
    pub body: Body,
    /// Credential policy
    pub credentials: Credentials,
    /// Transfer options the orchestrator does not interpret
    pub transfer_options: Map<String, Value>,
    /// Cancellation signal bound to this request
    pub signal: CancellationToken,
}

impl Request {
    /// Create a bare request with no headers and an empty body.
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Body::Empty,
            credentials: Credentials::default(),
            transfer_options: Map::new(),
            signal: CancellationToken::new(),
        }
    }

    /// Whether the request carries the programmatic-request marker
    #[must_use]
    pub fn is_programmatic(&self) -> bool {
        self.headers
            .get(REQUESTED_WITH_HEADER)
            .is_some_and(|value| value == REQUESTED_WITH_VALUE)
    }
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct Response {
    /// Status code
    pub status: StatusCode,
    /// Reason phrase sent by the server, or the canonical one
    pub reason: String,
    /// Final URL after redirects, when the transport knows it
    pub url: Option<Url>,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw body
    pub body: Bytes,
}

impl Response {
    /// Empty response with the canonical reason phrase for `status`.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            url: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Response with a JSON body and matching content type.
    #[must_use]
    pub fn json(status: StatusCode, value: &Value) -> Self {
        Self::new(status)
            .with_header(
                http::header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            )
            .with_body(value.to_string())
    }

    /// Replace the body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a header
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Whether the status is in the 2xx range
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Body as text, lossily decoded
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the body is not valid JSON for `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Immutable record of one request call.
///
/// Created when the call starts, shared with observers through every
/// lifecycle event, dropped once the call has completed.
#[derive(Debug, Clone)]
pub struct Operation {
    /// Correlation id
    pub id: OperationId,
    /// When the call started
    pub created_at: DateTime<Utc>,
    /// The outgoing request
    pub request: Request,
    /// The data argument as given
    pub data: RequestData,
    /// Merged options
    pub options: Options,
}

impl Operation {
    /// Create a descriptor for `request`.
    #[must_use]
    pub fn new(request: Request, data: RequestData, options: Options) -> Self {
        Self {
            id: OperationId::new(),
            created_at: Utc::now(),
            request,
            data,
            options,
        }
    }

    /// HTTP method
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.request.method
    }

    /// Absolute target
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.request.url
    }

    /// Cancellation handle of the call
    #[must_use]
    pub const fn abort_token(&self) -> &CancellationToken {
        &self.request.signal
    }

    /// Request the call to be aborted; no effect once it has settled.
    pub fn abort(&self) {
        self.request.signal.cancel();
    }
}
