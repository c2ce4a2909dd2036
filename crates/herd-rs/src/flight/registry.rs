//! In-flight registry keyed by fingerprint.
//!
//! Holds at most one [`FlightRecord`] per [`Fingerprint`]. The registry is an
//! ordinary value shared through `Arc`, so tests and separate orchestrators
//! can each own their own. The mutex is never held across an `.await` or
//! while user hooks run: callers take what they need out of the lock and
//! notify afterwards.

use crate::error::RegistryError;
use crate::flight::hooks::RequestHooks;
use crate::flight::outcome::Outcome;
use crate::flight::scheduler::CancelSignal;
use crate::request::{Coalescing, Fingerprint, Method};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;
use tracing::{debug, error};

/// One party waiting on a flight's outcome.
pub struct Subscriber {
    pub(crate) hooks: Arc<dyn RequestHooks>,
    pub(crate) done: oneshot::Sender<Outcome>,
}

impl Subscriber {
    pub(crate) fn new(hooks: Arc<dyn RequestHooks>, done: oneshot::Sender<Outcome>) -> Self {
        Self { hooks, done }
    }
}

/// Registry-owned state of one running flight.
pub struct FlightRecord {
    id: String,
    url: String,
    method: Method,
    attempts: Arc<AtomicU32>,
    subscribers: Vec<Subscriber>,
    cancel: CancelSignal,
    started_at: DateTime<Utc>,
}

impl FlightRecord {
    /// A record with no subscribers and a fresh cancellation signal.
    pub fn new(id: impl Into<String>, url: impl Into<String>, method: Method) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            method,
            attempts: Arc::new(AtomicU32::new(0)),
            subscribers: Vec::new(),
            cancel: CancelSignal::new(),
            started_at: Utc::now(),
        }
    }

    /// Flight ID of the leader that owns this record.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Attempts the leader has started so far.
    pub fn attempts_made(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Number of callers waiting on this flight.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Signal the leader watches for preemption.
    pub fn cancel_signal(&self) -> &CancelSignal {
        &self.cancel
    }

    /// Counter the leader bumps as it starts each attempt.
    pub(crate) fn attempts_counter(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.attempts)
    }

    pub(crate) fn into_subscribers(self) -> Vec<Subscriber> {
        self.subscribers
    }

    fn info(&self, fingerprint: &Fingerprint) -> FlightInfo {
        FlightInfo {
            id: self.id.clone(),
            fingerprint: fingerprint.clone(),
            url: self.url.clone(),
            method: self.method,
            attempts_made: self.attempts_made(),
            subscribers: self.subscribers.len(),
            started_at: self.started_at,
        }
    }
}

impl std::fmt::Debug for FlightRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlightRecord")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("method", &self.method)
            .field("attempts", &self.attempts_made())
            .field("subscribers", &self.subscribers.len())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Read-only view of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightInfo {
    pub id: String,
    pub fingerprint: Fingerprint,
    pub url: String,
    pub method: Method,
    pub attempts_made: u32,
    pub subscribers: usize,
    pub started_at: DateTime<Utc>,
}

/// Result of [`InFlightRegistry::claim`].
pub(crate) enum Claim {
    /// Joined an existing flight. Carries the leader's flight ID.
    Attached { flight_id: String },
    /// No flight existed; the new record is now registered.
    Registered,
    /// The previous record was removed and replaced. The caller must cancel
    /// it and notify its subscribers.
    Preempted(FlightRecord),
}

/// Fingerprint-keyed map of running flights.
///
/// Share one instance (through `Arc`) between every orchestrator that should
/// coalesce with the others.
#[derive(Default)]
pub struct InFlightRegistry {
    flights: Mutex<HashMap<Fingerprint, FlightRecord>>,
}

impl InFlightRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Fingerprint, FlightRecord>> {
        self.flights.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the record for `fingerprint`, if one is running.
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<FlightInfo> {
        self.lock().get(fingerprint).map(|r| r.info(fingerprint))
    }

    /// Whether a flight is running for `fingerprint`.
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.lock().contains_key(fingerprint)
    }

    /// Insert a record for a fingerprint that has none.
    ///
    /// A second record for the same fingerprint is refused with
    /// [`RegistryError::DuplicateKey`] and logged at `error`; the existing
    /// record is left in place. The orchestrator never calls this and goes
    /// through the combined attach/register/preempt step instead.
    pub fn register(
        &self,
        fingerprint: Fingerprint,
        record: FlightRecord,
    ) -> Result<(), RegistryError> {
        let mut flights = self.lock();
        if flights.contains_key(&fingerprint) {
            error!(fp = fingerprint.short(), "flight already registered");
            return Err(RegistryError::DuplicateKey(fingerprint));
        }
        flights.insert(fingerprint, record);
        Ok(())
    }

    /// Remove a record. Absent keys are a no-op.
    pub fn remove(&self, fingerprint: &Fingerprint) -> Option<FlightRecord> {
        self.lock().remove(fingerprint)
    }

    /// Number of running flights.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no flight is running.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// All running flights, oldest first.
    pub fn snapshot(&self) -> Vec<FlightInfo> {
        let mut infos: Vec<FlightInfo> = self
            .lock()
            .iter()
            .map(|(fp, record)| record.info(fp))
            .collect();
        infos.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)));
        infos
    }

    /// Attach, register, or preempt under a single lock.
    ///
    /// `record` is only used when no flight is attached to. `subscriber`
    /// always ends up on whichever record is registered afterwards.
    pub(crate) fn claim(
        &self,
        fingerprint: &Fingerprint,
        coalescing: Coalescing,
        subscriber: Subscriber,
        mut record: FlightRecord,
    ) -> Claim {
        let mut flights = self.lock();

        if let Some(existing) = flights.get_mut(fingerprint) {
            if coalescing == Coalescing::Share {
                existing.subscribers.push(subscriber);
                debug!(
                    fp = fingerprint.short(),
                    flight = %existing.id,
                    subscribers = existing.subscribers.len(),
                    "attached to running flight"
                );
                return Claim::Attached {
                    flight_id: existing.id.clone(),
                };
            }
        }

        record.subscribers.push(subscriber);
        match flights.insert(fingerprint.clone(), record) {
            Some(previous) => {
                debug_assert!(
                    coalescing == Coalescing::Preempt,
                    "shared submission replaced flight {} for {}",
                    previous.id,
                    fingerprint.short()
                );
                Claim::Preempted(previous)
            }
            None => Claim::Registered,
        }
    }

    /// Remove the record for `fingerprint` only if it still belongs to
    /// `flight_id`. A preempted leader gets `None` here.
    pub(crate) fn complete(&self, fingerprint: &Fingerprint, flight_id: &str) -> Option<FlightRecord> {
        let mut flights = self.lock();
        if flights.get(fingerprint).is_some_and(|r| r.id == flight_id) {
            flights.remove(fingerprint)
        } else {
            None
        }
    }

    /// Hooks of everyone currently attached to `flight_id`.
    pub(crate) fn subscribers(
        &self,
        fingerprint: &Fingerprint,
        flight_id: &str,
    ) -> Vec<Arc<dyn RequestHooks>> {
        self.lock()
            .get(fingerprint)
            .filter(|r| r.id == flight_id)
            .map(|r| r.subscribers.iter().map(|s| Arc::clone(&s.hooks)).collect())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for InFlightRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlightRegistry")
            .field("flights", &self.len())
            .finish()
    }
}
