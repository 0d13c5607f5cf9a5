//! # Courier HTTP Transport
//!
//! [`Transport`](courier_core::Transport) implementation on top of `reqwest`.
//!
//! ## Example
//!
//! ```no_run
//! use courier_core::{Method, Request, Transport, Url};
//! use courier_http::ReqwestTransport;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = ReqwestTransport::new();
//!
//!     let request = Request::new(Method::GET, Url::parse("https://example.com/")?);
//!     let response = transport.send(request).await?;
//!
//!     println!("Status: {}", response.status);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - Buffered responses with a size limit
//! - urlencoded, multipart, text, bytes and JSON bodies
//! - Credential policy applied to `Authorization` / `Cookie` headers

pub mod client;
pub mod error;

// Re-export main types for convenience
pub use client::ReqwestTransport;
pub use error::TransportBuildError;
