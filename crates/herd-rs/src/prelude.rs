//! Convenience re-exports for common `herd-rs` types.
//!
//! ```ignore
//! use herd_rs::prelude::*;
//! ```
//!
//! Registry internals and individual event variants are left out; import
//! those from their modules when needed.

// ── Requests ────────────────────────────────────────────────────────
pub use crate::request::{
    Coalescing, Fingerprint, Method, NormalizedUrl, RequestBuilder, RequestDescriptor,
};

// ── Transport ───────────────────────────────────────────────────────
pub use crate::api::{
    FailureKind, ReqwestTransport, RetryPolicy, Transport, TransportFuture, TransportRequest,
    TransportResponse,
};

// ── Orchestration ───────────────────────────────────────────────────
pub use crate::flight::{
    CallbackSet, CompositeSink, EventCategory, Failure, FlightEvent, FlightHandle, FnSink,
    InFlightRegistry, LoggingSink, NoHooks, NoopSink, Orchestrator, Outcome, RequestHooks,
    Response, Role, Sink,
};

// ── Config & errors ─────────────────────────────────────────────────
pub use crate::config::HerdConfig;
pub use crate::error::{HerdError, TransportError, ValidationError};
