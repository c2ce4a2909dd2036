//! The request orchestrator.
//!
//! [`Orchestrator::submit`] validates a descriptor, fires the start hook,
//! and claims the registry entry for its fingerprint. Depending on the
//! descriptor's [`Coalescing`](crate::request::Coalescing) mode and what is
//! already running, the submission either becomes a follower of the running
//! flight, preempts it, or becomes a new leader. Leaders run on the
//! [`Scheduler`] and drive attempts through the [`Transport`] until they
//! reach a terminal [`Outcome`], which every subscriber then receives once.

use crate::api::retry::RetryPolicy;
use crate::api::tracing::{attempt_label, generate_flight_id};
use crate::api::transport::{Transport, TransportRequest};
use crate::error::{HerdError, ValidationError};
use crate::flight::events::{FlightEvent, LoggingSink, Sink};
use crate::flight::hooks::RequestHooks;
use crate::flight::outcome::{Outcome, classify};
use crate::flight::registry::{Claim, FlightRecord, InFlightRegistry, Subscriber};
use crate::flight::scheduler::{CancelSignal, Scheduler, TokioScheduler};
use crate::request::{Fingerprint, RequestDescriptor};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::oneshot;
use tracing::{debug, error, trace, warn};

// ── State machine ──────────────────────────────────────────────────

/// Lifecycle of one submission.
///
/// `Idle → Validating → Starting → Attempting → (RetryWaiting ↔ Attempting)*
/// → Delivering → Finished`. Rejected submissions, followers, and cancelled
/// leaders jump straight to `Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightState {
    Idle,
    Validating,
    Starting,
    Attempting,
    RetryWaiting,
    Delivering,
    Finished,
}

impl FlightState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: FlightState) -> bool {
        use FlightState::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Validating, Starting | Finished)
                | (Starting, Attempting | Finished)
                | (Attempting, RetryWaiting | Delivering | Finished)
                | (RetryWaiting, Attempting | Finished)
                | (Delivering, Finished)
        )
    }

    fn advance(&mut self, next: FlightState) {
        debug_assert!(
            self.can_transition_to(next),
            "illegal flight transition {self:?} -> {next:?}"
        );
        trace!("flight state {:?} -> {:?}", self, next);
        *self = next;
    }
}

// ── Handle ─────────────────────────────────────────────────────────

/// Whether a submission drives transport calls or rides along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Leader,
    Follower,
}

/// Returned by [`Orchestrator::submit`]. Await [`wait`](Self::wait) for the
/// outcome; dropping the handle does not cancel the flight.
#[derive(Debug)]
pub struct FlightHandle {
    fingerprint: Fingerprint,
    flight_id: String,
    role: Role,
    rx: oneshot::Receiver<Outcome>,
}

impl FlightHandle {
    /// Coalescing key of the submitted URL.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// ID of the flight this submission is attached to.
    pub fn flight_id(&self) -> &str {
        &self.flight_id
    }

    /// `Leader` if this submission drives the transport calls.
    pub fn role(&self) -> Role {
        self.role
    }

    pub async fn wait(self) -> Result<Outcome, HerdError> {
        self.rx.await.map_err(|_| HerdError::Abandoned)
    }
}

// ── Orchestrator ───────────────────────────────────────────────────

/// Entry point for submitting requests.
///
/// Holds the transport, the registry shared by every submission, the
/// scheduler that runs leaders, and the sink that observes them. Cheap to
/// share behind an `Arc`; `submit` takes `&self`.
pub struct Orchestrator {
    transport: Arc<dyn Transport>,
    registry: Arc<InFlightRegistry>,
    scheduler: Arc<dyn Scheduler>,
    sink: Arc<dyn Sink>,
}

impl Orchestrator {
    /// Orchestrator with a fresh registry, the tokio scheduler, and a
    /// [`LoggingSink`].
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            registry: Arc::new(InFlightRegistry::new()),
            scheduler: Arc::new(TokioScheduler),
            sink: Arc::new(LoggingSink),
        }
    }

    /// Use an existing registry, e.g. one shared with another orchestrator.
    pub fn with_registry(mut self, registry: Arc<InFlightRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the task spawner.
    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Replace the event sink.
    pub fn with_sink(mut self, sink: impl Sink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// The registry this orchestrator coalesces through.
    pub fn registry(&self) -> &Arc<InFlightRegistry> {
        &self.registry
    }

    /// Submit a request. Returns immediately.
    ///
    /// On a validation error the hooks receive `on_error`, `on_error_end`,
    /// and `on_end` before this returns `Err`, and the registry is left
    /// untouched.
    pub fn submit(
        &self,
        descriptor: &RequestDescriptor,
        hooks: impl RequestHooks + 'static,
    ) -> Result<FlightHandle, ValidationError> {
        self.submit_shared(descriptor, Arc::new(hooks))
    }

    /// [`submit`](Self::submit) with hooks the caller keeps a handle to.
    pub fn submit_shared(
        &self,
        descriptor: &RequestDescriptor,
        hooks: Arc<dyn RequestHooks>,
    ) -> Result<FlightHandle, ValidationError> {
        let mut state = FlightState::Idle;
        state.advance(FlightState::Validating);

        let valid = match descriptor.validate() {
            Ok(valid) => valid,
            Err(err) => {
                let message = err.to_string();
                self.sink.emit(&FlightEvent::Rejected {
                    url: descriptor.url(),
                    error: &err,
                });
                hooks.on_error(&message);
                hooks.on_error_end("[INVALID]");
                hooks.on_end();
                state.advance(FlightState::Finished);
                return Err(err);
            }
        };

        state.advance(FlightState::Starting);
        hooks.on_start();

        let fingerprint = Fingerprint::of(&valid.url);
        let record = FlightRecord::new(generate_flight_id(), valid.url.as_str(), descriptor.method());
        let flight_id = record.id().to_string();
        let cancel = record.cancel_signal().clone();
        let attempts = record.attempts_counter();
        let (tx, rx) = oneshot::channel();

        match self.registry.claim(
            &fingerprint,
            descriptor.coalescing(),
            Subscriber::new(hooks, tx),
            record,
        ) {
            Claim::Attached {
                flight_id: leader_id,
            } => {
                self.sink.emit(&FlightEvent::Attached {
                    flight_id: &leader_id,
                    fingerprint: &fingerprint,
                });
                state.advance(FlightState::Finished);
                return Ok(FlightHandle {
                    fingerprint,
                    flight_id: leader_id,
                    role: Role::Follower,
                    rx,
                });
            }
            Claim::Preempted(previous) => self.release_preempted(previous, &flight_id),
            Claim::Registered => {}
        }

        let url = valid.url.to_string();
        self.sink.emit(&FlightEvent::Started {
            flight_id: &flight_id,
            fingerprint: &fingerprint,
            method: descriptor.method(),
            url: &url,
        });

        let leader = Leader {
            flight_id: flight_id.clone(),
            fingerprint: fingerprint.clone(),
            request: TransportRequest {
                method: descriptor.method(),
                url,
                headers: descriptor.headers().to_vec(),
                body: valid.body,
                content_type: descriptor.content_type().map(str::to_string),
            },
            policy: valid.retry,
            transport: Arc::clone(&self.transport),
            registry: Arc::clone(&self.registry),
            sink: Arc::clone(&self.sink),
            cancel,
            attempts,
            state,
        };
        self.scheduler.spawn(Box::pin(leader.run()));

        Ok(FlightHandle {
            fingerprint,
            flight_id,
            role: Role::Leader,
            rx,
        })
    }

    /// Cancel a replaced flight and give its subscribers their end hook.
    fn release_preempted(&self, previous: FlightRecord, by: &str) {
        previous.cancel_signal().cancel();
        let attempts_made = previous.attempts_made();
        let flight_id = previous.id().to_string();
        let subscribers = previous.into_subscribers();

        self.sink.emit(&FlightEvent::Preempted {
            flight_id: &flight_id,
            by,
            subscribers: subscribers.len(),
        });

        for sub in subscribers {
            contain_panic(&flight_id, || sub.hooks.on_end());
            let _ = sub.done.send(Outcome::Preempted { attempts_made });
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

// ── Leader ─────────────────────────────────────────────────────────

/// The task that drives one flight's transport attempts.
struct Leader {
    flight_id: String,
    fingerprint: Fingerprint,
    request: TransportRequest,
    policy: RetryPolicy,
    transport: Arc<dyn Transport>,
    registry: Arc<InFlightRegistry>,
    sink: Arc<dyn Sink>,
    cancel: CancelSignal,
    attempts: Arc<AtomicU32>,
    state: FlightState,
}

impl Leader {
    async fn run(mut self) {
        let mut attempt: u32 = 0;
        let total = self.policy.total_attempts();

        let result = loop {
            if self.cancel.is_cancelled() {
                return self.exit_cancelled();
            }
            self.state.advance(FlightState::Attempting);
            self.attempts.store(attempt + 1, Ordering::SeqCst);
            debug!(
                attempt = %attempt_label(&self.flight_id, attempt + 1, total),
                "sending {} {}",
                self.request.method,
                self.request.url
            );
            self.sink.emit(&FlightEvent::AttemptStarted {
                flight_id: &self.flight_id,
                attempt: attempt + 1,
                total,
            });

            let sent = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                result = self.transport.send(&self.request) => Some(result),
            };
            let Some(sent) = sent else {
                return self.exit_cancelled();
            };

            match classify(sent) {
                Ok(response) => break Ok(response),
                Err(failure) if self.policy.should_retry(attempt, failure.kind) => {
                    let retry = attempt + 1;
                    let message = format!(
                        "[Attempt {retry}/{}] {}",
                        self.policy.max_attempts, failure.message
                    );
                    let delay = self.policy.delay_for(attempt);
                    self.sink.emit(&FlightEvent::Retrying {
                        flight_id: &self.flight_id,
                        attempt: retry,
                        max_attempts: self.policy.max_attempts,
                        delay,
                        message: &message,
                    });
                    for hooks in self.registry.subscribers(&self.fingerprint, &self.flight_id) {
                        contain_panic(&self.flight_id, || hooks.on_error(&message));
                    }

                    self.state.advance(FlightState::RetryWaiting);
                    let slept = tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => false,
                        _ = tokio::time::sleep(delay) => true,
                    };
                    if !slept {
                        return self.exit_cancelled();
                    }
                    attempt = retry;
                }
                Err(failure) => break Err(failure),
            }
        };

        self.state.advance(FlightState::Delivering);
        let attempts_made = attempt + 1;

        let Some(record) = self.registry.complete(&self.fingerprint, &self.flight_id) else {
            // Replaced between the last attempt and delivery.
            return self.exit_cancelled();
        };
        let subscribers = record.into_subscribers();

        let responded = match &result {
            Ok(_) => true,
            Err(failure) => failure.code.is_some(),
        };
        if responded {
            self.sink.emit(&FlightEvent::Progress {
                flight_id: &self.flight_id,
                percent: 100,
            });
        }

        match result {
            Ok(response) => {
                self.sink.emit(&FlightEvent::Succeeded {
                    flight_id: &self.flight_id,
                    response: &response,
                    subscribers: subscribers.len(),
                });
                for sub in subscribers {
                    contain_panic(&self.flight_id, || {
                        sub.hooks.on_progress(100);
                        sub.hooks.on_success();
                        sub.hooks.on_result(&response);
                        sub.hooks.on_end();
                    });
                    let _ = sub.done.send(Outcome::Success(response.clone()));
                }
            }
            Err(mut failure) => {
                failure.attempts_made = attempts_made;
                if failure.kind.is_retryable() && attempts_made > 1 {
                    failure.message = format!("Max retries reached > {}", failure.message);
                }
                let detail = failure.detail();
                self.sink.emit(&FlightEvent::Failed {
                    flight_id: &self.flight_id,
                    failure: &failure,
                    subscribers: subscribers.len(),
                });
                for sub in subscribers {
                    contain_panic(&self.flight_id, || {
                        if failure.code.is_some() {
                            sub.hooks.on_progress(100);
                        }
                        sub.hooks.on_error(&failure.message);
                        sub.hooks.on_error_end(&detail);
                        sub.hooks.on_end();
                    });
                    let _ = sub.done.send(Outcome::Failure(failure.clone()));
                }
            }
        }

        self.sink.emit(&FlightEvent::Finished {
            flight_id: &self.flight_id,
            attempts_made,
        });
        self.state.advance(FlightState::Finished);
    }

    fn exit_cancelled(mut self) {
        warn!(
            "[{}] cancelled after {} attempt(s); subscribers already released",
            self.flight_id,
            self.attempts.load(Ordering::SeqCst)
        );
        self.state.advance(FlightState::Finished);
    }
}

/// Run one subscriber's hook calls so that a panic in them cannot stop
/// delivery to the remaining subscribers.
fn contain_panic(flight_id: &str, hooks: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(hooks)) {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".into());
        error!("[{flight_id}] subscriber hook panicked: {reason}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use FlightState::*;

    #[test]
    fn happy_path_transitions() {
        let path = [
            Idle,
            Validating,
            Starting,
            Attempting,
            RetryWaiting,
            Attempting,
            Delivering,
            Finished,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn early_exits_allowed() {
        assert!(Validating.can_transition_to(Finished));
        assert!(Starting.can_transition_to(Finished));
        assert!(Attempting.can_transition_to(Finished));
        assert!(RetryWaiting.can_transition_to(Finished));
    }

    #[test]
    fn illegal_transitions_rejected() {
        assert!(!Idle.can_transition_to(Attempting));
        assert!(!Starting.can_transition_to(Delivering));
        assert!(!RetryWaiting.can_transition_to(Delivering));
        assert!(!Delivering.can_transition_to(Attempting));
        assert!(!Finished.can_transition_to(Idle));
    }

    #[test]
    fn contained_panic_does_not_propagate() {
        let mut ran_after = false;
        contain_panic("fl-test", || panic!("hook blew up"));
        contain_panic("fl-test", || ran_after = true);
        assert!(ran_after);
    }

    #[test]
    fn advance_updates_state() {
        let mut state = Idle;
        state.advance(Validating);
        assert_eq!(state, Validating);
    }
}
