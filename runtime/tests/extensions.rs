//! Extension registry, collaborator injection and the built-in extensions.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use courier_core::{EventKind, Method, Options, OrchestratorError, RequestData, StatusCode};
use courier_runtime::extensions::{AbortExtension, TimeoutExtension, UniqueExtension};
use courier_runtime::{CollaboratorSlot, Collaborators, Extension, Orchestrator};
use courier_testing::{init_tracing, EventRecorder, MockTransport, Reply};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use EventKind::{Abort, Before, Complete, Init, Start, Success};

type Log = Arc<Mutex<Vec<String>>>;

/// Records its name each time it is initialized.
struct Named {
    name: &'static str,
    log: Log,
}

impl Extension for Named {
    fn initialize(&self, _orchestrator: &Orchestrator) {
        self.log.lock().unwrap().push(self.name.to_string());
    }
}

fn named(name: &'static str, log: &Log) -> Arc<dyn Extension> {
    Arc::new(Named {
        name,
        log: Arc::clone(log),
    })
}

fn orchestrator(transport: &MockTransport) -> Orchestrator {
    init_tracing();
    Orchestrator::new(Arc::new(transport.clone()))
}

#[test]
fn test_extensions_initialized_in_registration_order() {
    let orchestrator = orchestrator(&MockTransport::new());
    let log = Log::default();

    orchestrator.register_extension(named("first", &log));
    orchestrator.register_extension(named("second", &log));
    orchestrator.register_extension(named("third", &log));
    assert!(log.lock().unwrap().is_empty(), "nothing runs before startup");

    orchestrator.initialize(Options::new()).unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    assert!(orchestrator.is_initialized());
}

#[test]
fn test_initialize_twice_fails() {
    let orchestrator = orchestrator(&MockTransport::new());
    let log = Log::default();
    orchestrator.register_extension(named("only", &log));
    let recorder = EventRecorder::attach(orchestrator.events());

    orchestrator.initialize(Options::new()).unwrap();
    let second = orchestrator.initialize(Options::new().with("history", false));

    assert!(matches!(second, Err(OrchestratorError::AlreadyInitialized)));
    assert_eq!(*log.lock().unwrap(), vec!["only"], "no re-initialization");
    assert_eq!(recorder.kinds(), vec![Init]);
    assert_eq!(orchestrator.default_options().flag("history"), None);
}

#[test]
fn test_extension_registered_after_startup_initialized_immediately() {
    let orchestrator = orchestrator(&MockTransport::new());
    let log = Log::default();
    orchestrator.initialize(Options::new()).unwrap();

    orchestrator.register_extension(named("late", &log));

    assert_eq!(*log.lock().unwrap(), vec!["late"]);
    assert_eq!(orchestrator.extension_count(), 1);
}

#[test]
fn test_extension_registered_during_startup_initialized_once() {
    let orchestrator = orchestrator(&MockTransport::new());
    let log = Log::default();

    let nested = named("nested", &log);
    let outer_log = Arc::clone(&log);
    orchestrator.register_extension(Arc::new(move |orchestrator: &Orchestrator| {
        outer_log.lock().unwrap().push("outer".to_string());
        orchestrator.register_extension(Arc::clone(&nested));
    }));
    orchestrator.register_extension(named("after", &log));

    orchestrator.initialize(Options::new()).unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["outer", "after", "nested"]);
}

#[test]
fn test_extension_registered_from_init_listener_is_initialized() {
    let orchestrator = orchestrator(&MockTransport::new());
    let log = Log::default();

    // Listeners only get the notification, so capture a handle up front
    let handle = orchestrator.clone();
    let from_init = named("from-init", &log);
    orchestrator.on(Init, move |_notification| {
        handle.register_extension(Arc::clone(&from_init));
    });

    orchestrator.initialize(Options::new()).unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["from-init"]);
}

#[test]
fn test_init_carries_default_options() {
    let orchestrator = orchestrator(&MockTransport::new());
    let recorder = EventRecorder::attach(orchestrator.events());

    orchestrator
        .initialize(Options::new().with("history", false))
        .unwrap();

    let event = recorder.last(Init).expect("init recorded");
    assert_eq!(event.options().flag("history"), Some(false));
    assert!(event.operation().is_none());
}

#[test]
fn test_collaborators_attached_on_build() {
    init_tracing();
    let log = Log::default();
    let orchestrator = Orchestrator::builder()
        .transport(Arc::new(MockTransport::new()))
        .collaborators(
            Collaborators::new()
                .with(CollaboratorSlot::History, named("history", &log))
                .with(CollaboratorSlot::Ui, named("ui", &log)),
        )
        .build();

    assert_eq!(*log.lock().unwrap(), vec!["ui", "history"]);
    assert!(orchestrator.collaborator(CollaboratorSlot::Ui).is_some());
    assert!(orchestrator.collaborator(CollaboratorSlot::Redirect).is_none());

    orchestrator.initialize(Options::new()).unwrap();
    assert_eq!(log.lock().unwrap().len(), 2, "collaborators are not extensions");
}

#[tokio::test]
async fn test_unique_aborts_previous_request() {
    let transport = MockTransport::new()
        .with_reply(Reply::pending())
        .with_reply(Reply::json(StatusCode::OK, &json!({"page": 2})));
    let orchestrator = orchestrator(&transport);
    let unique = UniqueExtension::new();
    orchestrator.register_extension(Arc::new(unique.clone()));
    orchestrator.initialize(Options::new()).unwrap();
    let recorder = EventRecorder::attach(orchestrator.events());

    let first = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move {
            orchestrator
                .make_request(Method::GET, "/page/1", RequestData::Empty, Options::new())
                .await
        }
    });
    while transport.request_count() < 1 {
        tokio::task::yield_now().await;
    }

    let second = orchestrator
        .make_request(Method::GET, "/page/2", RequestData::Empty, Options::new())
        .await
        .expect("second call succeeds");
    assert_eq!(second.get("page"), Some(&json!(2)));

    let first = first.await.unwrap().expect("superseded call resolves");
    assert!(first.is_empty());

    let operations = recorder.operations();
    assert_eq!(recorder.kinds_for(operations[0]), vec![Before, Start, Abort, Complete]);
    assert_eq!(recorder.kinds_for(operations[1]), vec![Before, Start, Success, Complete]);
    assert_eq!(unique.in_flight(), 0);
}

#[tokio::test]
async fn test_unique_keys_and_opt_out() {
    let transport = MockTransport::new()
        .with_reply(Reply::json(StatusCode::OK, &json!({})).after(Duration::from_millis(20)))
        .with_reply(Reply::json(StatusCode::OK, &json!({})).after(Duration::from_millis(20)))
        .with_reply(Reply::json(StatusCode::OK, &json!({})).after(Duration::from_millis(20)));
    let orchestrator = orchestrator(&transport);
    orchestrator.register_extension(Arc::new(UniqueExtension::new()));
    orchestrator.initialize(Options::new()).unwrap();
    let recorder = EventRecorder::attach(orchestrator.events());

    let results = futures::future::join_all([
        orchestrator.make_request(Method::GET, "/a", RequestData::Empty, Options::new()),
        orchestrator.make_request(
            Method::GET,
            "/b",
            RequestData::Empty,
            Options::new().with("unique", "sidebar"),
        ),
        orchestrator.make_request(
            Method::GET,
            "/c",
            RequestData::Empty,
            Options::new().with("unique", false),
        ),
    ])
    .await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(recorder.count(Success), 3);
    assert_eq!(recorder.count(Abort), 0);
}

#[tokio::test]
async fn test_abort_all_spares_opted_out_requests() {
    let transport = MockTransport::new()
        .with_reply(Reply::pending())
        .with_reply(Reply::json(StatusCode::OK, &json!({"kept": true})).after(Duration::from_millis(50)));
    let orchestrator = orchestrator(&transport);
    let abort = AbortExtension::new();
    orchestrator.register_extension(Arc::new(abort.clone()));
    orchestrator.initialize(Options::new()).unwrap();

    let abortable = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move {
            orchestrator
                .make_request(Method::GET, "/poll", RequestData::Empty, Options::new())
                .await
        }
    });
    let kept = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move {
            orchestrator
                .make_request(
                    Method::POST,
                    "/save",
                    RequestData::Empty,
                    Options::new().with("abort", false),
                )
                .await
        }
    });
    while transport.request_count() < 2 {
        tokio::task::yield_now().await;
    }

    assert_eq!(abort.in_flight(), 1);
    assert_eq!(abort.abort_all(), 1);

    assert!(abortable.await.unwrap().unwrap().is_empty());
    let kept = kept.await.unwrap().unwrap();
    assert_eq!(kept.get("kept"), Some(&json!(true)));
    assert_eq!(abort.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_aborts_slow_request() {
    let transport = MockTransport::new().with_reply(Reply::pending());
    let orchestrator = orchestrator(&transport);
    orchestrator.register_extension(Arc::new(TimeoutExtension::new()));
    orchestrator.initialize(Options::new()).unwrap();
    let recorder = EventRecorder::attach(orchestrator.events());

    let payload = orchestrator
        .make_request(
            Method::GET,
            "/slow",
            RequestData::Empty,
            Options::new().with("timeout", 100),
        )
        .await
        .expect("timeouts resolve like aborts");

    assert!(payload.is_empty());
    assert_eq!(recorder.kinds(), vec![Before, Start, Abort, Complete]);
}

#[tokio::test(start_paused = true)]
async fn test_default_timeout_spares_fast_request() {
    let transport = MockTransport::new()
        .with_reply(Reply::json(StatusCode::OK, &json!({"fast": true})).after(Duration::from_millis(10)));
    let orchestrator = orchestrator(&transport);
    orchestrator.register_extension(Arc::new(TimeoutExtension::with_default(
        Duration::from_secs(1),
    )));
    orchestrator.initialize(Options::new()).unwrap();

    let payload = orchestrator
        .make_request(Method::GET, "/fast", RequestData::Empty, Options::new())
        .await
        .unwrap();
    assert_eq!(payload.get("fast"), Some(&json!(true)));
}
