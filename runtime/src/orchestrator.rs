//! The request orchestrator and its lifecycle state machine.
//!
//! ```text
//! idle ─▶ before ─┬─▶ canceled                       (resolves to an empty payload)
//!                 └─▶ in-flight ─┬─▶ aborted   ─┐
//!                                ├─▶ failed    ─┼─▶ complete
//!                                └─▶ succeeded ─┘
//! ```
//!
//! Only the `failed` branch surfaces as an `Err` to the caller. Cancellation,
//! whether of `before` by an observer or of the in-flight transfer through
//! its token, resolves with [`Payload::default`].

use crate::collaborators::{CollaboratorSlot, Collaborators};
use crate::extension::Extension;
use crate::metrics::{self, Outcome};
use courier_core::request::{REQUESTED_WITH_HEADER, REQUESTED_WITH_VALUE};
use courier_core::{
    AbortEvent, BeforeEvent, CancellationToken, CompleteEvent, ErrorEvent, EventKind, HttpError,
    InitEvent, LifecycleBus, LifecycleEvent, Method, Notification, Operation, Options,
    OrchestratorError, Payload, Request, RequestData, Response, StartEvent, SubscriptionId,
    SuccessEvent, Transfer, TransferOptions, Transport, transform,
};
use courier_http::ReqwestTransport;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Protocol version exposed to collaborators.
pub const VERSION: u32 = 2;

/// Location relative targets are resolved against when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost/";

/// State of a single request call, used for logging transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Inputs normalized, nothing emitted yet
    Idle,
    /// `before` is being dispatched
    Before,
    /// An observer canceled `before`
    Canceled,
    /// The transfer was issued
    InFlight,
    /// The transfer was canceled through its token
    Aborted,
    /// Transfer, status or decoding failure
    Failed,
    /// The payload was decoded
    Succeeded,
    /// `complete` was dispatched
    Complete,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Before => "before",
            Self::Canceled => "canceled",
            Self::InFlight => "in-flight",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
            Self::Succeeded => "succeeded",
            Self::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Target of a request: an absolute URL or a string resolved against the
/// orchestrator's base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Already absolute
    Url(Url),
    /// Absolute or relative reference
    Reference(String),
}

impl From<Url> for Target {
    fn from(url: Url) -> Self {
        Self::Url(url)
    }
}

impl From<&Url> for Target {
    fn from(url: &Url) -> Self {
        Self::Url(url.clone())
    }
}

impl From<&str> for Target {
    fn from(reference: &str) -> Self {
        Self::Reference(reference.to_string())
    }
}

impl From<String> for Target {
    fn from(reference: String) -> Self {
        Self::Reference(reference)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Starting,
    Started,
}

struct Registry {
    phase: Phase,
    extensions: Vec<Arc<dyn Extension>>,
    default_options: Options,
}

struct Inner {
    transport: Arc<dyn Transport>,
    bus: LifecycleBus,
    base_url: Url,
    collaborators: Collaborators,
    registry: Mutex<Registry>,
}

/// Drives request calls through their lifecycle.
///
/// Cloning is cheap and yields another handle to the same orchestrator:
/// same listeners, same extensions, same defaults.
///
/// # Example
///
/// ```no_run
/// use courier_core::{EventKind, LifecycleEvent, Method, Options, RequestData};
/// use courier_runtime::Orchestrator;
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let orchestrator = Orchestrator::builder()
///     .base_url("https://shop.example.com/".parse()?)
///     .build();
///
/// orchestrator.on(EventKind::Success, |notification| {
///     if let LifecycleEvent::Success(detail) = notification.event() {
///         println!("{} answered {}", detail.operation.url(), detail.response.status);
///     }
/// });
/// orchestrator.initialize(Options::new())?;
///
/// let payload = orchestrator
///     .make_request(Method::POST, "/cart", RequestData::from(json!({"sku": 42})), Options::new())
///     .await?;
/// println!("redirect to {:?}", payload.redirect);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

/// Builder for [`Orchestrator`].
#[derive(Default)]
pub struct OrchestratorBuilder {
    transport: Option<Arc<dyn Transport>>,
    base_url: Option<Url>,
    collaborators: Collaborators,
}

impl OrchestratorBuilder {
    /// Use `transport` instead of the default `reqwest` one
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Location relative targets are resolved against
    #[must_use]
    pub fn base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Collaborators attached when the orchestrator is built
    #[must_use]
    pub fn collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = collaborators;
        self
    }

    /// Build the orchestrator and attach its collaborators.
    #[must_use]
    pub fn build(self) -> Orchestrator {
        let base_url = self.base_url.unwrap_or_else(default_base_url);
        let transport = self.transport.unwrap_or_else(|| {
            Arc::new(ReqwestTransport::new().with_origin(&base_url)) as Arc<dyn Transport>
        });

        let orchestrator = Orchestrator {
            inner: Arc::new(Inner {
                transport,
                bus: LifecycleBus::new(),
                base_url,
                collaborators: self.collaborators,
                registry: Mutex::new(Registry {
                    phase: Phase::Idle,
                    extensions: Vec::new(),
                    default_options: Options::default(),
                }),
            }),
        };

        for (slot, collaborator) in orchestrator.inner.collaborators.iter() {
            debug!(collaborator = %slot, "attaching collaborator");
            collaborator.initialize(&orchestrator);
        }

        orchestrator
    }
}

#[allow(clippy::expect_used)] // DEFAULT_BASE_URL is a valid absolute URL
pub(crate) fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("DEFAULT_BASE_URL parses")
}

impl Orchestrator {
    /// Start building an orchestrator
    #[must_use]
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    /// Orchestrator over `transport` with the default base URL and no collaborators
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::builder().transport(transport).build()
    }

    /// The lifecycle event bus
    #[must_use]
    pub fn events(&self) -> &LifecycleBus {
        &self.inner.bus
    }

    /// Subscribe to lifecycle events of `kind`
    pub fn on<F>(&self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&Notification<'_>) + Send + Sync + 'static,
    {
        self.inner.bus.subscribe(kind, listener)
    }

    /// Remove a listener added with [`on`](Self::on)
    pub fn off(&self, id: SubscriptionId) -> bool {
        self.inner.bus.unsubscribe(id)
    }

    /// Location relative targets are resolved against
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// The collaborator injected into `slot`, if any
    #[must_use]
    pub fn collaborator(&self, slot: CollaboratorSlot) -> Option<Arc<dyn Extension>> {
        self.inner.collaborators.get(slot).cloned()
    }

    /// Whether [`initialize`](Self::initialize) has completed
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.registry().phase == Phase::Started
    }

    /// Current process-wide default options
    #[must_use]
    pub fn default_options(&self) -> Options {
        self.registry().default_options.clone()
    }

    /// Replace the process-wide default options.
    ///
    /// Allowed at any time; affects calls made afterwards only.
    pub fn set_default_options(&self, options: Options) {
        self.registry().default_options = options;
    }

    /// Number of registered extensions
    #[must_use]
    pub fn extension_count(&self) -> usize {
        self.registry().extensions.len()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.inner
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an extension.
    ///
    /// Before startup the extension is queued and initialized by
    /// [`initialize`](Self::initialize); afterwards it is initialized right
    /// away. Either way it is initialized exactly once.
    pub fn register_extension(&self, extension: Arc<dyn Extension>) {
        let started = {
            let mut registry = self.registry();
            registry.extensions.push(Arc::clone(&extension));
            registry.phase == Phase::Started
        };

        if started {
            debug!("initializing extension registered after startup");
            extension.initialize(self);
            metrics::record_extension_initialized();
        }
    }

    /// Start the orchestrator.
    ///
    /// Stores `default_options`, initializes every registered extension in
    /// registration order and emits `init`.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::AlreadyInitialized` on any call after the
    /// first one.
    pub fn initialize(&self, default_options: Options) -> Result<(), OrchestratorError> {
        {
            let mut registry = self.registry();
            if registry.phase != Phase::Idle {
                return Err(OrchestratorError::AlreadyInitialized);
            }
            registry.phase = Phase::Starting;
            registry.default_options = default_options.clone();
        }

        // Extensions registered from inside an initializer are picked up too.
        let mut initialized = 0;
        loop {
            let next = {
                let mut registry = self.registry();
                let next = registry.extensions.get(initialized).cloned();
                if next.is_none() {
                    registry.phase = Phase::Started;
                }
                next
            };
            let Some(extension) = next else {
                break;
            };
            extension.initialize(self);
            metrics::record_extension_initialized();
            initialized += 1;
        }

        info!(extensions = initialized, "orchestrator initialized");
        self.emit(&LifecycleEvent::Init(InitEvent { default_options }));
        Ok(())
    }

    fn emit(&self, event: &LifecycleEvent) -> bool {
        self.inner.bus.dispatch(event)
    }

    fn resolve(&self, target: Target) -> Result<Url, OrchestratorError> {
        match target {
            Target::Url(url) => Ok(url),
            Target::Reference(reference) => self
                .inner
                .base_url
                .join(&reference)
                .map_err(|source| OrchestratorError::InvalidUrl {
                    url: reference,
                    source,
                }),
        }
    }

    /// Issue a request and drive it through the lifecycle.
    ///
    /// Resolves with the decoded payload on success, and with an empty
    /// payload when an observer cancels `before` or the transfer is aborted
    /// through its cancellation token.
    ///
    /// # Errors
    ///
    /// - `InvalidUrl` / `InvalidHeader` when the request cannot be built; no
    ///   event is emitted in that case
    /// - `Http` when the response status is not a success
    /// - `Transfer` when the transport fails
    /// - `Decode` when the body is not a valid payload
    #[instrument(skip_all, fields(method = %method))]
    pub async fn make_request(
        &self,
        method: Method,
        target: impl Into<Target>,
        data: impl Into<RequestData>,
        options: Options,
    ) -> Result<Payload, OrchestratorError> {
        let mut url = self.resolve(target.into())?;
        let data = data.into();
        let options = self.default_options().merged(&options);
        let headers = build_headers(&options.fetch)?;
        let body = transform::transform_data(&mut url, &method, &data);
        let signal = CancellationToken::new();

        let request = Request {
            method,
            url,
            headers,
            body,
            credentials: options.fetch.credentials(),
            transfer_options: options.fetch.extra.clone(),
            signal: signal.clone(),
        };
        let operation = Arc::new(Operation::new(request, data, options));
        transition(&operation, RequestState::Idle);

        transition(&operation, RequestState::Before);
        let proceed = self.emit(&LifecycleEvent::Before(BeforeEvent {
            operation: Arc::clone(&operation),
        }));
        if !proceed {
            transition(&operation, RequestState::Canceled);
            metrics::record(Outcome::Canceled, None);
            return Ok(Payload::default());
        }

        let started = Instant::now();
        let transfer = Transfer::start(self.inner.transport.as_ref(), operation.request.clone());
        transition(&operation, RequestState::InFlight);
        self.emit(&LifecycleEvent::Start(StartEvent {
            operation: Arc::clone(&operation),
            transfer: transfer.clone(),
            abort: signal.clone(),
        }));

        let mut guard = InFlightGuard {
            orchestrator: self,
            operation: Arc::clone(&operation),
            signal,
            started,
            armed: true,
        };
        let result = transfer.await;
        guard.disarm();

        let settled = settle(result);
        let elapsed = Some(started.elapsed());

        match settled {
            Ok((response, payload)) => {
                transition(&operation, RequestState::Succeeded);
                metrics::record(Outcome::Success, elapsed);
                self.emit(&LifecycleEvent::Success(SuccessEvent {
                    operation: Arc::clone(&operation),
                    response: response.clone(),
                    payload: payload.clone(),
                }));
                self.complete(operation, Some(response), Some(payload.clone()), None);
                Ok(payload)
            }
            Err((_, error)) if error.is_aborted() => {
                transition(&operation, RequestState::Aborted);
                metrics::record(Outcome::Abort, elapsed);
                self.emit(&LifecycleEvent::Abort(AbortEvent {
                    operation: Arc::clone(&operation),
                    error: error.clone(),
                }));
                self.complete(operation, None, None, Some(error));
                Ok(Payload::default())
            }
            Err((response, error)) => {
                transition(&operation, RequestState::Failed);
                warn!(
                    operation_id = %operation.id,
                    url = %operation.url(),
                    error = %error,
                    "request failed"
                );
                metrics::record(Outcome::Error, elapsed);
                self.emit(&LifecycleEvent::Error(ErrorEvent {
                    operation: Arc::clone(&operation),
                    response: response.clone(),
                    error: error.clone(),
                }));
                self.complete(operation, response, None, Some(error.clone()));
                Err(error)
            }
        }
    }

    fn complete(
        &self,
        operation: Arc<Operation>,
        response: Option<Response>,
        payload: Option<Payload>,
        error: Option<OrchestratorError>,
    ) {
        transition(&operation, RequestState::Complete);
        self.emit(&LifecycleEvent::Complete(CompleteEvent {
            operation,
            response,
            payload,
            error,
        }));
    }
}

/// Settles a started call as aborted when its `make_request` future is
/// dropped before the transfer does, so `complete` still fires once.
struct InFlightGuard<'a> {
    orchestrator: &'a Orchestrator,
    operation: Arc<Operation>,
    signal: CancellationToken,
    started: Instant,
    armed: bool,
}

impl InFlightGuard<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed || std::thread::panicking() {
            return;
        }

        self.signal.cancel();
        debug!(operation_id = %self.operation.id, "request dropped while in flight");
        transition(&self.operation, RequestState::Aborted);
        metrics::record(Outcome::Abort, Some(self.started.elapsed()));

        let error = OrchestratorError::Aborted;
        self.orchestrator.emit(&LifecycleEvent::Abort(AbortEvent {
            operation: Arc::clone(&self.operation),
            error: error.clone(),
        }));
        self.orchestrator
            .complete(Arc::clone(&self.operation), None, None, Some(error));
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("base_url", &self.inner.base_url.as_str())
            .field("initialized", &self.is_initialized())
            .field("extensions", &self.extension_count())
            .field("bus", &self.inner.bus)
            .finish_non_exhaustive()
    }
}

fn transition(operation: &Operation, state: RequestState) {
    debug!(
        operation_id = %operation.id,
        method = %operation.method(),
        url = %operation.url(),
        state = %state,
        "request state"
    );
}

/// Status is checked before the body is decoded: a failure status never
/// yields a payload, decodable or not.
fn settle(
    result: courier_core::TransferResult,
) -> Result<(Response, Payload), (Option<Response>, OrchestratorError)> {
    let response = result.map_err(|error| (None, OrchestratorError::from(error)))?;

    if !response.is_success() {
        let error = HttpError::new(response.clone());
        return Err((Some(response), error.into()));
    }

    match response.decode::<serde_json::Value>().and_then(Payload::from_json) {
        Ok(payload) => Ok((response, payload)),
        Err(error) => Err((Some(response), OrchestratorError::Decode(error.to_string()))),
    }
}

fn build_headers(options: &TransferOptions) -> Result<HeaderMap, OrchestratorError> {
    let mut headers = HeaderMap::new();

    for (name, value) in options.headers.iter().flatten() {
        let invalid = |reason: String| OrchestratorError::InvalidHeader {
            name: name.clone(),
            reason,
        };
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
        let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
        headers.append(header_name, header_value);
    }

    headers.insert(
        HeaderName::from_static(REQUESTED_WITH_HEADER),
        HeaderValue::from_static(REQUESTED_WITH_VALUE),
    );
    Ok(headers)
}
