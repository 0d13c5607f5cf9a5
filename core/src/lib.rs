//! # Courier Core
//!
//! Core types for the Courier request orchestrator.
//!
//! This crate holds everything the orchestrator and its collaborators share
//! without depending on a concrete HTTP stack:
//!
//! - **Data model**: call data ([`RequestData`], [`DataValue`]), request
//!   bodies ([`Body`]), [`Options`] and the decoded [`Payload`]
//! - **Data transformer**: flattening of nested data into query pairs
//! - **Lifecycle events**: the event contract and a typed [`LifecycleBus`]
//! - **Transport seam**: the [`Transport`] trait and the in-flight [`Transfer`]
//! - **Errors**: [`OrchestratorError`], [`HttpError`], [`TransferError`]
//!
//! ## Example
//!
//! ```
//! use courier_core::{transform, Method, RequestData, Url};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), url::ParseError> {
//! let mut url = Url::parse("https://example.com/search")?;
//! let body = transform::transform_data(
//!     &mut url,
//!     &Method::GET,
//!     &RequestData::from(json!({"filter": {"tags": ["a", "b"]}})),
//! );
//!
//! assert!(body.is_empty());
//! assert_eq!(url.query(), Some("filter%5Btags%5D%5B0%5D=a&filter%5Btags%5D%5B1%5D=b"));
//! # Ok(())
//! # }
//! ```

pub mod data;
pub mod error;
pub mod event;
pub mod event_bus;
pub mod options;
pub mod payload;
pub mod request;
pub mod transform;
pub mod transport;

// Re-export main types for convenience
pub use data::{Body, DataValue, FormData, RequestData};
pub use error::{HttpError, OrchestratorError, TransferError};
pub use event::{
    AbortEvent, BeforeEvent, CompleteEvent, ErrorEvent, EventKind, InitEvent, LifecycleEvent,
    StartEvent, SuccessEvent,
};
pub use event_bus::{LifecycleBus, Listener, Notification, SubscriptionId};
pub use options::{Credentials, Options, TransferOptions};
pub use payload::Payload;
pub use request::{Operation, OperationId, Request, Response};
pub use transport::{Transfer, TransferResult, Transport};

pub use http::{Method, StatusCode};
pub use tokio_util::sync::CancellationToken;
pub use url::Url;
