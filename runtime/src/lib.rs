//! # Courier Runtime
//!
//! The request orchestrator for Courier.
//!
//! ## Core Components
//!
//! - **Orchestrator**: drives each request call through its lifecycle and
//!   emits `init`/`before`/`start`/`abort`/`error`/`success`/`complete`
//! - **Extension registry**: extensions receive the orchestrator once it is
//!   started, or immediately when registered later
//! - **Collaborators**: UI, redirect, snippet, form, history and script
//!   handlers injected through named slots
//! - **Built-in extensions**: unique calls, abort-all, timeouts
//!
//! ## Example
//!
//! ```no_run
//! use courier_core::{Method, Options, RequestData};
//! use courier_runtime::extensions::{AbortExtension, UniqueExtension};
//! use courier_runtime::Orchestrator;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = Orchestrator::builder()
//!     .base_url("https://shop.example.com/".parse()?)
//!     .build();
//!
//! let abort = AbortExtension::new();
//! orchestrator.register_extension(Arc::new(UniqueExtension::new()));
//! orchestrator.register_extension(Arc::new(abort.clone()));
//! orchestrator.initialize(Options::new().with_header("Accept", "application/json"))?;
//!
//! let payload = orchestrator
//!     .make_request(Method::GET, "/search", RequestData::from(json!({"q": "boots"})), Options::new())
//!     .await?;
//! for (id, html) in payload.snippets.iter().flatten() {
//!     println!("{id}: {html}");
//! }
//!
//! // Leaving the page
//! abort.abort_all();
//! # Ok(())
//! # }
//! ```

/// Injected collaborators
pub mod collaborators;

/// Configuration loading
pub mod config;

/// Extension contract
pub mod extension;

/// Built-in extensions
pub mod extensions;

/// Request metrics
pub mod metrics;

/// The orchestrator
pub mod orchestrator;

pub use collaborators::{CollaboratorSlot, Collaborators};
pub use config::{ConfigError, CourierConfig};
pub use extension::Extension;
pub use orchestrator::{Orchestrator, OrchestratorBuilder, RequestState, Target, VERSION};
