//! Basic request demo
//!
//! Issues one request through the orchestrator and logs its lifecycle.
//!
//! ```text
//! COURIER_BASE_URL=https://httpbin.org/ cargo run -p basic-request -- get
//! ```
//!
//! The first argument is the target, resolved against the base URL; the
//! optional second one is the method (GET by default).

use anyhow::Context;
use courier_core::{EventKind, LifecycleEvent, Method, Options, RequestData};
use courier_runtime::extensions::{AbortExtension, TimeoutExtension, UniqueExtension};
use courier_runtime::CourierConfig;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "basic_request=info,courier_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let target = args.next().unwrap_or_else(|| "/".to_string());
    let method = match args.next() {
        Some(raw) => Method::from_bytes(raw.to_uppercase().as_bytes())
            .with_context(|| format!("invalid method {raw}"))?,
        None => Method::GET,
    };

    let config = CourierConfig::from_env().context("loading configuration")?;
    let orchestrator = config.build().context("building orchestrator")?;

    orchestrator.register_extension(Arc::new(UniqueExtension::new()));
    orchestrator.register_extension(Arc::new(AbortExtension::new()));
    orchestrator.register_extension(Arc::new(match config.default_timeout() {
        Some(timeout) => TimeoutExtension::with_default(timeout),
        None => TimeoutExtension::new(),
    }));

    for kind in EventKind::ALL {
        orchestrator.on(kind, |notification| match notification.event() {
            LifecycleEvent::Init(_) => info!("orchestrator ready"),
            LifecycleEvent::Success(success) => info!(
                status = %success.response.status,
                keys = ?success.payload.extra.keys().collect::<Vec<_>>(),
                "received payload"
            ),
            LifecycleEvent::Error(failure) => error!(error = %failure.error, "request failed"),
            event => info!(event = %event.kind(), "lifecycle"),
        });
    }

    orchestrator
        .initialize(config.default_options.clone())
        .context("initializing orchestrator")?;

    let data = if method == Method::GET {
        RequestData::from(json!({"source": "courier", "tags": ["demo", "basic"]}))
    } else {
        RequestData::from(json!({"message": {"text": "hello", "lang": "en"}}))
    };

    let payload = orchestrator
        .make_request(method, target.as_str(), data, Options::new())
        .await?;

    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}
