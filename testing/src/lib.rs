//! # Courier Testing
//!
//! Testing utilities for Courier.
//!
//! This crate provides:
//! - [`MockTransport`]: a scripted [`Transport`](courier_core::Transport)
//!   that records requests
//! - [`EventRecorder`]: captures lifecycle events in dispatch order
//! - [`fixtures`]: common response payloads
//! - [`init_tracing`]: test-friendly `tracing` subscriber
//!
//! ## Example
//!
//! ```ignore
//! use courier_testing::{EventRecorder, MockTransport, Reply};
//! use courier_runtime::Orchestrator;
//!
//! #[tokio::test]
//! async fn test_success_flow() {
//!     let transport = MockTransport::new().with_reply(Reply::json(StatusCode::OK, &fixtures::snippets()));
//!     let orchestrator = Orchestrator::new(Arc::new(transport));
//!     let recorder = EventRecorder::attach(orchestrator.events());
//!
//!     orchestrator.make_request(Method::GET, "/", RequestData::Empty, Options::new()).await?;
//!
//!     assert_eq!(recorder.kinds(), vec![Before, Start, Success, Complete]);
//! }
//! ```

pub mod recorder;
pub mod transport;

pub use recorder::EventRecorder;
pub use transport::{MockTransport, Reply};

use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Response payloads used across test suites.
pub mod fixtures {
    use serde_json::{json, Value};

    /// Payload replacing two snippets
    #[must_use]
    pub fn snippets() -> Value {
        json!({
            "snippets": {
                "snippet--cart": "<p>2 items</p>",
                "snippet--flash": "<p>Added</p>"
            }
        })
    }

    /// Payload asking for a redirect
    #[must_use]
    pub fn redirect(url: &str) -> Value {
        json!({"redirect": url, "forceRedirect": true})
    }
}

static TRACING: Once = Once::new();

/// Install a `tracing` subscriber writing to the test output.
///
/// Filtered by `RUST_LOG`, `debug` for Courier crates otherwise. Safe to
/// call from every test.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("courier_core=debug,courier_runtime=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_are_objects() {
        assert!(fixtures::snippets()["snippets"].is_object());
        assert_eq!(fixtures::redirect("/home")["forceRedirect"], true);
    }
}
