//! Error taxonomy.
//!
//! Callers only ever see [`ValidationError`] (from `submit`) and
//! [`HerdError`] (from `FlightHandle::wait` and config parsing). Transport
//! errors are folded into a [`Failure`](crate::flight::outcome::Failure)
//! before they reach hooks, and [`RegistryError`] never leaves the crate's
//! orchestration path.

use crate::request::{Fingerprint, Method};
use thiserror::Error;

/// A descriptor rejected before any registry or transport work.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("URL is empty")]
    EmptyUrl,
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("unsupported URL scheme '{0}' (expected http or https)")]
    UnsupportedScheme(String),
    #[error("{method} request has a body but no content type")]
    MissingContentType { method: Method },
    #[error("retry delay must be finite and non-negative, got {0}")]
    InvalidDelay(f64),
}

/// A single transport attempt that produced no HTTP response at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request timed out")]
    Timeout,
    #[error("request failed: {0}")]
    Other(String),
}

/// Internal invariant violation in the in-flight registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("a flight is already registered for {0}")]
    DuplicateKey(Fingerprint),
}

/// Top-level error for handle waits and configuration.
#[derive(Debug, Error)]
pub enum HerdError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("flight ended without delivering an outcome")]
    Abandoned,
    #[error("config error: {0}")]
    Config(String),
}
