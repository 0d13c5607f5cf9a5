//! End-to-end calls through the `reqwest` transport against a mock server.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use courier_core::{Method, Options, RequestData, StatusCode};
use courier_runtime::CourierConfig;
use courier_testing::{fixtures, init_tracing, EventRecorder};
use serde_json::json;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use courier_core::EventKind::{Before, Complete, Error, Start, Success};

async fn orchestrator_for(server: &MockServer) -> courier_runtime::Orchestrator {
    init_tracing();
    let config = CourierConfig::from_toml_str(&format!(
        r#"
        base_url = "{}/"
        user_agent = "courier-tests"
        "#,
        server.uri()
    ))
    .expect("valid configuration");
    let orchestrator = config.build().expect("client builds");
    orchestrator
        .initialize(config.default_options.clone())
        .unwrap();
    orchestrator
}

#[tokio::test]
async fn test_get_with_query_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "boots"))
        .and(query_param("size[0]", "42"))
        .and(header("x-requested-with", "XMLHttpRequest"))
        .and(header("user-agent", "courier-tests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::snippets()))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = orchestrator_for(&server).await;
    let recorder = EventRecorder::attach(orchestrator.events());

    let payload = orchestrator
        .make_request(
            Method::GET,
            "search",
            json!({"q": "boots", "size": [42]}),
            Options::new(),
        )
        .await
        .expect("call succeeds");

    assert_eq!(payload.snippet("snippet--flash"), Some("<p>Added</p>"));
    assert_eq!(recorder.kinds(), vec![Before, Start, Success, Complete]);
}

#[tokio::test]
async fn test_post_sends_urlencoded_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cart"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("item%5Bsku%5D=A1&item%5Bqty%5D=2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::redirect("/checkout")))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = orchestrator_for(&server).await;

    let payload = orchestrator
        .make_request(
            Method::POST,
            "/cart",
            json!({"item": {"sku": "A1", "qty": 2}}),
            Options::new(),
        )
        .await
        .expect("call succeeds");

    assert_eq!(payload.redirect.as_deref(), Some("/checkout"));
    assert!(payload.force_redirect());
}

#[tokio::test]
async fn test_server_error_takes_error_branch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"snippets": {}})))
        .mount(&server)
        .await;

    let orchestrator = orchestrator_for(&server).await;
    let recorder = EventRecorder::attach(orchestrator.events());

    let error = orchestrator
        .make_request(Method::GET, "/", RequestData::Empty, Options::new())
        .await
        .expect_err("500 fails");

    assert_eq!(error.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(error.to_string(), "HTTP 500: Internal Server Error");
    assert_eq!(recorder.kinds(), vec![Before, Start, Error, Complete]);
}
