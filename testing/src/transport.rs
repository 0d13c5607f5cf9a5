//! Scripted transport.
//!
//! [`MockTransport`] answers requests from a queue of [`Reply`] values and
//! records every request it receives. When the queue is empty it falls back
//! to a `200 OK` with an empty JSON object.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity

use courier_core::{Request, Response, StatusCode, TransferError, TransferResult, Transport};
use futures::future::{self, BoxFuture, FutureExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How a reply settles.
#[derive(Debug, Clone)]
enum Outcome {
    Settle(TransferResult),
    Never,
}

/// One scripted answer.
#[derive(Debug, Clone)]
pub struct Reply {
    outcome: Outcome,
    delay: Option<Duration>,
}

impl Reply {
    /// Answer with `response`
    #[must_use]
    pub const fn response(response: Response) -> Self {
        Self {
            outcome: Outcome::Settle(Ok(response)),
            delay: None,
        }
    }

    /// Answer with `value` serialized as the body
    #[must_use]
    pub fn json(status: StatusCode, value: &Value) -> Self {
        Self::response(Response::json(status, value))
    }

    /// Answer with a raw text body
    #[must_use]
    pub fn text(status: StatusCode, body: &str) -> Self {
        Self::response(Response::new(status).with_body(body.to_string()))
    }

    /// Fail the transfer
    #[must_use]
    pub const fn error(error: TransferError) -> Self {
        Self {
            outcome: Outcome::Settle(Err(error)),
            delay: None,
        }
    }

    /// Never settle; only cancellation ends the transfer
    #[must_use]
    pub const fn pending() -> Self {
        Self {
            outcome: Outcome::Never,
            delay: None,
        }
    }

    /// Settle after `delay`
    #[must_use]
    pub const fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Debug)]
struct Script {
    replies: VecDeque<Reply>,
    fallback: Reply,
    requests: Vec<Request>,
}

/// Transport answering from a script.
///
/// # Example
///
/// ```
/// use courier_core::{Method, Request, StatusCode, Transport, Url};
/// use courier_testing::{MockTransport, Reply};
/// use serde_json::json;
///
/// # #[tokio::main]
/// # async fn main() {
/// let transport = MockTransport::new().with_reply(Reply::json(StatusCode::CREATED, &json!({"id": 7})));
///
/// let url = Url::parse("http://localhost/items").unwrap();
/// let response = transport.send(Request::new(Method::POST, url)).await.unwrap();
///
/// assert_eq!(response.status, StatusCode::CREATED);
/// assert_eq!(transport.request_count(), 1);
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct MockTransport {
    script: Arc<Mutex<Script>>,
}

impl MockTransport {
    /// Transport answering `200 {}` to everything
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                replies: VecDeque::new(),
                fallback: Reply::json(StatusCode::OK, &Value::Object(serde_json::Map::new())),
                requests: Vec::new(),
            })),
        }
    }

    /// Queue `reply` for the next unanswered request
    #[must_use]
    pub fn with_reply(self, reply: Reply) -> Self {
        self.push(reply);
        self
    }

    /// Answer with `reply` once the queue is exhausted
    #[must_use]
    pub fn with_fallback(self, reply: Reply) -> Self {
        self.script.lock().unwrap().fallback = reply;
        self
    }

    /// Queue `reply` for the next unanswered request
    pub fn push(&self, reply: Reply) {
        self.script.lock().unwrap().replies.push_back(reply);
    }

    /// Every request received so far, in order
    #[must_use]
    pub fn requests(&self) -> Vec<Request> {
        self.script.lock().unwrap().requests.clone()
    }

    /// Most recent request
    #[must_use]
    pub fn last_request(&self) -> Option<Request> {
        self.script.lock().unwrap().requests.last().cloned()
    }

    /// Number of requests received
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.script.lock().unwrap().requests.len()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: Request) -> BoxFuture<'static, TransferResult> {
        let reply = {
            let mut script = self.script.lock().unwrap();
            script.requests.push(request);
            script
                .replies
                .pop_front()
                .unwrap_or_else(|| script.fallback.clone())
        };

        async move {
            if let Some(delay) = reply.delay {
                tokio::time::sleep(delay).await;
            }
            match reply.outcome {
                Outcome::Settle(result) => result,
                Outcome::Never => future::pending().await,
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{Method, Url};

    fn request() -> Request {
        Request::new(Method::GET, Url::parse("http://localhost/").unwrap())
    }

    #[tokio::test]
    async fn test_replies_in_order_then_fallback() {
        let transport = MockTransport::new()
            .with_reply(Reply::text(StatusCode::ACCEPTED, "first"))
            .with_reply(Reply::error(TransferError::Network("down".into())));

        assert_eq!(transport.send(request()).await.unwrap().text(), "first");
        assert!(transport.send(request()).await.is_err());
        assert_eq!(transport.send(request()).await.unwrap().text(), "{}");
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_reply() {
        let transport = MockTransport::new()
            .with_reply(Reply::text(StatusCode::OK, "late").after(Duration::from_secs(10)));

        let started = tokio::time::Instant::now();
        let response = transport.send(request()).await.unwrap();
        assert_eq!(response.text(), "late");
        assert!(started.elapsed() >= Duration::from_secs(10));
    }
}
