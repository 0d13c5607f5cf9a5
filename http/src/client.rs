//! `reqwest` transport implementation

use crate::error::{classify, TransportBuildError};
use courier_core::{Body, Credentials, FormData, Request, Response, TransferError, TransferResult, Transport};
use futures::future::{BoxFuture, FutureExt};
use futures::StreamExt;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE, COOKIE};
use reqwest::Client;
use url::{Origin, Url};

/// Maximum response size (50MB)
const MAX_RESPONSE_SIZE: usize = 50 * 1024 * 1024;

/// Transport performing transfers with a shared `reqwest::Client`.
///
/// Credentials are honoured by stripping `Authorization` and `Cookie`
/// headers: always for [`Credentials::Omit`], and for
/// [`Credentials::SameOrigin`] when the target's origin differs from the
/// configured one.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: Client,
    origin: Option<Origin>,
    max_response_size: usize,
}

impl ReqwestTransport {
    /// Create a transport with a default client
    #[must_use]
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Create a transport around an existing client
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self {
            client,
            origin: None,
            max_response_size: MAX_RESPONSE_SIZE,
        }
    }

    /// Create a transport whose client sends `user_agent`
    ///
    /// # Errors
    ///
    /// Returns `TransportBuildError::Client` if the client cannot be built
    pub fn with_user_agent(user_agent: &str) -> Result<Self, TransportBuildError> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self::with_client(client))
    }

    /// Set the origin used to decide same-origin credentials
    #[must_use]
    pub fn with_origin(mut self, url: &Url) -> Self {
        self.origin = Some(url.origin());
        self
    }

    /// Override the response size limit
    #[must_use]
    pub const fn with_max_response_size(mut self, limit: usize) -> Self {
        self.max_response_size = limit;
        self
    }

    fn sends_credentials(&self, request: &Request) -> bool {
        match request.credentials {
            Credentials::Include => true,
            Credentials::Omit => false,
            Credentials::SameOrigin => self
                .origin
                .as_ref()
                .is_none_or(|origin| *origin == request.url.origin()),
        }
    }

    fn build(&self, request: Request) -> reqwest::RequestBuilder {
        let mut headers = request.headers.clone();
        if !self.sends_credentials(&request) {
            headers.remove(AUTHORIZATION);
            headers.remove(COOKIE);
        }

        let Request {
            method, url, body, ..
        } = request;

        match body {
            Body::Empty => self.client.request(method, url).headers(headers),
            Body::UrlEncoded(pairs) => self.client.request(method, url).headers(headers).form(&pairs),
            Body::Multipart(form) => self
                .client
                .request(method, url)
                .headers(headers)
                .multipart(multipart(&form)),
            Body::Text(text) => {
                headers
                    .entry(CONTENT_TYPE)
                    .or_insert(HeaderValue::from_static("text/plain;charset=UTF-8"));
                self.client.request(method, url).headers(headers).body(text)
            }
            Body::Bytes(bytes) => self.client.request(method, url).headers(headers).body(bytes),
            Body::Json(value) => self.client.request(method, url).headers(headers).json(&value),
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn multipart(form: &FormData) -> reqwest::multipart::Form {
    form.entries()
        .iter()
        .fold(reqwest::multipart::Form::new(), |parts, (name, value)| {
            parts.text(name.clone(), value.clone())
        })
}

impl Transport for ReqwestTransport {
    fn send(&self, request: Request) -> BoxFuture<'static, TransferResult> {
        tracing::debug!(method = %request.method, url = %request.url, "sending request");
        let builder = self.build(request);
        let limit = self.max_response_size;

        async move {
            let response = builder.send().await.map_err(|e| classify(&e))?;

            let status = response.status();
            let url = response.url().clone();
            let headers = response.headers().clone();

            // Stream response with size limit
            let mut body = Vec::new();
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| classify(&e))?;
                if body.len() + chunk.len() > limit {
                    return Err(TransferError::Network(format!(
                        "Response too large (>{limit} bytes)"
                    )));
                }
                body.extend_from_slice(&chunk);
            }

            let mut buffered = Response::new(status).with_body(body);
            buffered.url = Some(url);
            buffered.headers = headers;
            Ok(buffered)
        }
        .boxed()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use courier_core::{Method, StatusCode};
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(method: Method, url: &str) -> Request {
        let url = Url::parse(url).expect("valid url");
        Request::new(method, url)
    }

    #[tokio::test]
    async fn test_get_returns_buffered_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/items"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true}"#))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new();
        let response = transport
            .send(request(Method::GET, &format!("{}/items?page=2", server.uri())))
            .await
            .expect("transfer succeeds");

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.text(), r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn test_urlencoded_body_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string("user%5Bname%5D=ann"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let mut outgoing = request(Method::POST, &server.uri());
        outgoing.body = Body::UrlEncoded(vec![("user[name]".into(), "ann".into())]);

        let response = ReqwestTransport::new()
            .send(outgoing)
            .await
            .expect("transfer succeeds");
        assert_eq!(response.status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_failure_status_is_not_a_transfer_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let response = ReqwestTransport::new()
            .send(request(Method::GET, &server.uri()))
            .await
            .expect("a 404 is still a completed transfer");
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.reason, "Not Found");
    }

    #[tokio::test]
    async fn test_omit_credentials_strips_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let mut outgoing = request(Method::GET, &server.uri());
        outgoing
            .headers
            .insert(AUTHORIZATION, HeaderValue::from_static("Bearer secret"));
        outgoing.credentials = Credentials::Omit;

        ReqwestTransport::new()
            .send(outgoing)
            .await
            .expect("transfer succeeds");

        let received = server.received_requests().await.unwrap();
        assert_eq!(received.len(), 1);
        assert!(!received[0].headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn test_cross_origin_drops_same_origin_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let mut outgoing = request(Method::GET, &server.uri());
        outgoing
            .headers
            .insert(COOKIE, HeaderValue::from_static("session=1"));

        let other = Url::parse("https://app.example.com/").expect("valid url");
        ReqwestTransport::new()
            .with_origin(&other)
            .send(outgoing)
            .await
            .expect("transfer succeeds");

        let received = server.received_requests().await.unwrap();
        assert!(!received[0].headers.contains_key("cookie"));
    }

    #[tokio::test]
    async fn test_response_size_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(64)))
            .mount(&server)
            .await;

        let result = ReqwestTransport::new()
            .with_max_response_size(16)
            .send(request(Method::GET, &server.uri()))
            .await;
        assert!(matches!(result, Err(TransferError::Network(_))));
    }

    #[tokio::test]
    async fn test_connection_refused_is_connect_error() {
        // Port 9 (discard) is almost never listening locally
        let result = ReqwestTransport::new()
            .send(request(Method::GET, "http://127.0.0.1:9/"))
            .await;
        assert!(matches!(result, Err(TransferError::Connect(_))));
    }
}
