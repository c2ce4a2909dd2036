//! Flight orchestration: coalescing, retries, and outcome delivery.
//!
//! - [`orchestrator::Orchestrator`]: validates submissions, claims the
//!   registry, and drives leader flights. Start here.
//! - [`registry`]: the fingerprint-keyed [`InFlightRegistry`].
//! - [`hooks`]: per-subscriber [`RequestHooks`] and the closure-backed
//!   [`CallbackSet`].
//! - [`events`]: [`FlightEvent`] and the [`Sink`] observers.
//! - [`outcome`]: the terminal [`Outcome`] values.
//! - [`scheduler`]: [`Scheduler`] and [`CancelSignal`].

pub mod events;
pub mod hooks;
pub mod orchestrator;
pub mod outcome;
pub mod registry;
pub mod scheduler;

pub use events::{CompositeSink, EventCategory, FlightEvent, FnSink, LoggingSink, NoopSink, Sink};
pub use hooks::{CallbackSet, NoHooks, RequestHooks};
pub use orchestrator::{FlightHandle, FlightState, Orchestrator, Role};
pub use outcome::{Failure, FailureKind, Outcome, Response};
pub use registry::{FlightInfo, FlightRecord, InFlightRegistry};
pub use scheduler::{CancelSignal, Scheduler, TokioScheduler};
