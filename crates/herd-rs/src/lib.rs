//! Deduplicating, retrying HTTP request orchestrator.
//!
//! `herd-rs` runs HTTP requests described by a [`RequestDescriptor`],
//! retries transient failures with a fixed delay, and coalesces concurrent
//! requests for the same URL into a single flight. Every caller attached to
//! a flight receives exactly one terminal outcome through its own
//! [`RequestHooks`](flight::RequestHooks).
//!
//! # Getting started
//!
//! ```ignore
//! use herd_rs::prelude::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), HerdError> {
//!     let transport = ReqwestTransport::new(Duration::from_secs(30), "herd/0.1")
//!         .map_err(|e| HerdError::Config(e.to_string()))?;
//!     let orchestrator = Orchestrator::new(Arc::new(transport));
//!
//!     let request = RequestDescriptor::get("http://example.com/items")
//!         .max_attempts(2)
//!         .delay_seconds(0.5)
//!         .build();
//!
//!     let hooks = CallbackSet::new()
//!         .with_result(|resp| println!("{}", resp.body))
//!         .with_error(|msg| eprintln!("{msg}"));
//!
//!     let outcome = orchestrator.submit(&request, hooks)?.wait().await?;
//!     println!("success: {}", outcome.is_success());
//!     Ok(())
//! }
//! ```
//!
//! # Coalescing
//!
//! Identity is the SHA-256 of the normalized URL only (`http` is upgraded
//! to `https`). Method and body are ignored, so a `POST` and a `GET` to the
//! same URL share a flight under [`Coalescing::Share`]. With
//! [`Coalescing::Preempt`] a new submission cancels the running flight
//! instead; its subscribers receive only their end hook.
//!
//! # Modules
//!
//! - [`request`]: descriptors, builder, URL normalization, fingerprints.
//! - [`api`]: the [`Transport`](api::Transport) seam, retry policy, flight IDs.
//! - [`flight`]: registry, hooks, events, outcomes, and the orchestrator.
//! - [`config`]: JSON configuration.
//! - [`error`]: error types.

pub mod api;
pub mod config;
pub mod error;
pub mod flight;
pub mod prelude;
pub mod request;

pub use error::{HerdError, RegistryError, TransportError, ValidationError};
pub use request::{Coalescing, Fingerprint, Method, RequestDescriptor};
