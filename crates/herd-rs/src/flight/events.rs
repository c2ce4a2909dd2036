//! Structured flight events and the sinks that observe them.
//!
//! The orchestrator reports every lifecycle step as a [`FlightEvent`].
//! Sinks are purely observational: [`Sink::emit`] returns nothing, so a sink
//! cannot influence retries or delivery.
//!
//! | Sink | Use case |
//! |------|----------|
//! | [`NoopSink`] | Tests or silent runs |
//! | [`LoggingSink`] | Structured logging via `tracing` |
//! | [`FnSink`] | Quick closures |
//! | [`CompositeSink`] | Fan out to several sinks in order |

use crate::error::ValidationError;
use crate::flight::outcome::{Failure, Response};
use crate::request::{Fingerprint, Method};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

// ── Events ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum FlightEvent<'a> {
    /// A descriptor failed validation. No flight exists.
    Rejected {
        url: &'a str,
        error: &'a ValidationError,
    },
    /// A new leader registered and is about to make its first attempt.
    Started {
        flight_id: &'a str,
        fingerprint: &'a Fingerprint,
        method: Method,
        url: &'a str,
    },
    /// A submission joined a running flight.
    Attached {
        flight_id: &'a str,
        fingerprint: &'a Fingerprint,
    },
    /// A running flight was cancelled by a `Preempt` submission.
    Preempted {
        flight_id: &'a str,
        by: &'a str,
        subscribers: usize,
    },
    AttemptStarted {
        flight_id: &'a str,
        attempt: u32,
        total: u32,
    },
    Progress {
        flight_id: &'a str,
        percent: u8,
    },
    /// An attempt failed and another will follow after `delay`.
    Retrying {
        flight_id: &'a str,
        attempt: u32,
        max_attempts: u32,
        delay: Duration,
        message: &'a str,
    },
    Failed {
        flight_id: &'a str,
        failure: &'a Failure,
        subscribers: usize,
    },
    Succeeded {
        flight_id: &'a str,
        response: &'a Response,
        subscribers: usize,
    },
    /// The flight's record is gone and every subscriber has been notified.
    Finished {
        flight_id: &'a str,
        attempts_made: u32,
    },
}

/// Coarse grouping of events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    Start,
    Progress,
    Retry,
    Error,
    Success,
    End,
}

impl FlightEvent<'_> {
    /// Coarse category for filtering and metrics.
    pub fn category(&self) -> EventCategory {
        match self {
            FlightEvent::Started { .. } | FlightEvent::Attached { .. } => EventCategory::Start,
            FlightEvent::AttemptStarted { .. } | FlightEvent::Progress { .. } => {
                EventCategory::Progress
            }
            FlightEvent::Retrying { .. } => EventCategory::Retry,
            FlightEvent::Rejected { .. } | FlightEvent::Failed { .. } => EventCategory::Error,
            FlightEvent::Succeeded { .. } => EventCategory::Success,
            FlightEvent::Preempted { .. } | FlightEvent::Finished { .. } => EventCategory::End,
        }
    }

    /// Flight ID, when the event belongs to a flight.
    pub fn flight_id(&self) -> Option<&str> {
        match self {
            FlightEvent::Rejected { .. } => None,
            FlightEvent::Started { flight_id, .. }
            | FlightEvent::Attached { flight_id, .. }
            | FlightEvent::Preempted { flight_id, .. }
            | FlightEvent::AttemptStarted { flight_id, .. }
            | FlightEvent::Progress { flight_id, .. }
            | FlightEvent::Retrying { flight_id, .. }
            | FlightEvent::Failed { flight_id, .. }
            | FlightEvent::Succeeded { flight_id, .. }
            | FlightEvent::Finished { flight_id, .. } => Some(flight_id),
        }
    }
}

// ── Sinks ──────────────────────────────────────────────────────────

/// Observer for flight events.
pub trait Sink: Send + Sync {
    fn emit(&self, event: &FlightEvent<'_>);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl Sink for NoopSink {
    fn emit(&self, _event: &FlightEvent<'_>) {}
}

/// Logs events through `tracing`.
///
/// Failures and retries log at `warn`, flight boundaries at `info`, and
/// per-attempt chatter at `debug`/`trace`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

impl Sink for LoggingSink {
    fn emit(&self, event: &FlightEvent<'_>) {
        match event {
            FlightEvent::Rejected { url, error } => {
                warn!("[herd] rejected {url}: {error}");
            }
            FlightEvent::Started {
                flight_id,
                fingerprint,
                method,
                url,
            } => {
                info!("[{flight_id}] {method} {url} (fp {})", fingerprint.short());
            }
            FlightEvent::Attached {
                flight_id,
                fingerprint,
            } => {
                debug!("[{flight_id}] follower attached (fp {})", fingerprint.short());
            }
            FlightEvent::Preempted {
                flight_id,
                by,
                subscribers,
            } => {
                info!("[{flight_id}] preempted by {by}, {subscribers} subscriber(s) released");
            }
            FlightEvent::AttemptStarted {
                flight_id,
                attempt,
                total,
            } => {
                debug!("[{flight_id}] attempt {attempt}/{total}");
            }
            FlightEvent::Progress { flight_id, percent } => {
                trace!("[{flight_id}] progress {percent}%");
            }
            FlightEvent::Retrying {
                flight_id,
                delay,
                message,
                ..
            } => {
                warn!("[{flight_id}] {message}; retrying in {:.2}s", delay.as_secs_f64());
            }
            FlightEvent::Failed {
                flight_id,
                failure,
                subscribers,
            } => {
                warn!(
                    "[{flight_id}] failed after {} attempt(s): {} ({subscribers} subscriber(s))",
                    failure.attempts_made, failure.message
                );
            }
            FlightEvent::Succeeded {
                flight_id,
                response,
                subscribers,
            } => {
                info!(
                    "[{flight_id}] HTTP {} ({} bytes, {subscribers} subscriber(s))",
                    response.code,
                    response.body.len()
                );
            }
            FlightEvent::Finished {
                flight_id,
                attempts_made,
            } => {
                debug!("[{flight_id}] finished after {attempts_made} attempt(s)");
            }
        }
    }
}

/// Wraps a closure as a [`Sink`].
pub struct FnSink<F>(pub F)
where
    F: Fn(&FlightEvent<'_>) + Send + Sync;

impl<F> Sink for FnSink<F>
where
    F: Fn(&FlightEvent<'_>) + Send + Sync,
{
    fn emit(&self, event: &FlightEvent<'_>) {
        (self.0)(event)
    }
}

/// Forwards each event to every inner sink in registration order.
///
/// ```ignore
/// let sink = CompositeSink::new()
///     .with(LoggingSink)
///     .with_if(record, FnSink(|e| counts.bump(e.category())));
/// ```
#[derive(Default)]
pub struct CompositeSink {
    sinks: Vec<Box<dyn Sink>>,
}

impl CompositeSink {
    /// An empty composite that discards every event.
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    /// Add a sink. Sinks are called in registration order.
    pub fn with(mut self, sink: impl Sink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Add `sink` only when `condition` holds.
    pub fn with_if(self, condition: bool, sink: impl Sink + 'static) -> Self {
        if condition { self.with(sink) } else { self }
    }

    /// Add a sink from an `Option`. `None` is a no-op.
    pub fn with_opt(self, sink: Option<impl Sink + 'static>) -> Self {
        match sink {
            Some(s) => self.with(s),
            None => self,
        }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl Sink for CompositeSink {
    fn emit(&self, event: &FlightEvent<'_>) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn progress(percent: u8) -> FlightEvent<'static> {
        FlightEvent::Progress {
            flight_id: "fl-1",
            percent,
        }
    }

    #[test]
    fn categories() {
        let fp = Fingerprint::compute("https://example.com");
        let err = ValidationError::EmptyUrl;
        assert_eq!(
            FlightEvent::Rejected { url: "", error: &err }.category(),
            EventCategory::Error
        );
        assert_eq!(
            FlightEvent::Attached {
                flight_id: "fl-1",
                fingerprint: &fp
            }
            .category(),
            EventCategory::Start
        );
        assert_eq!(progress(100).category(), EventCategory::Progress);
        assert_eq!(
            FlightEvent::Retrying {
                flight_id: "fl-1",
                attempt: 1,
                max_attempts: 2,
                delay: Duration::ZERO,
                message: "x",
            }
            .category(),
            EventCategory::Retry
        );
        assert_eq!(
            FlightEvent::Finished {
                flight_id: "fl-1",
                attempts_made: 1
            }
            .category(),
            EventCategory::End
        );
    }

    #[test]
    fn flight_id_accessor() {
        let err = ValidationError::EmptyUrl;
        assert_eq!(FlightEvent::Rejected { url: "", error: &err }.flight_id(), None);
        assert_eq!(progress(5).flight_id(), Some("fl-1"));
    }

    #[test]
    fn composite_forwards_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (seen.clone(), seen.clone());
        let sink = CompositeSink::new()
            .with(FnSink(move |_: &FlightEvent<'_>| a.lock().unwrap().push("a")))
            .with_if(false, NoopSink)
            .with_opt(None::<NoopSink>)
            .with(FnSink(move |_: &FlightEvent<'_>| b.lock().unwrap().push("b")));

        assert_eq!(sink.len(), 2);
        sink.emit(&progress(50));
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn logging_sink_handles_every_variant() {
        let fp = Fingerprint::compute("https://example.com");
        let err = ValidationError::EmptyUrl;
        let response = Response {
            code: 200,
            body: "ok".into(),
        };
        let failure = Failure {
            kind: crate::api::retry::FailureKind::Protocol,
            code: Some(500),
            message: "HTTP 500".into(),
            body: None,
            attempts_made: 1,
        };
        let events = [
            FlightEvent::Rejected { url: "", error: &err },
            FlightEvent::Started {
                flight_id: "fl-1",
                fingerprint: &fp,
                method: Method::Get,
                url: "https://example.com/",
            },
            FlightEvent::Preempted {
                flight_id: "fl-1",
                by: "fl-2",
                subscribers: 1,
            },
            FlightEvent::Failed {
                flight_id: "fl-1",
                failure: &failure,
                subscribers: 1,
            },
            FlightEvent::Succeeded {
                flight_id: "fl-1",
                response: &response,
                subscribers: 2,
            },
        ];
        for event in &events {
            LoggingSink.emit(event);
        }
    }
}
