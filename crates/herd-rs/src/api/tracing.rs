//! Flight IDs for log correlation.
//!
//! IDs read as `fl-<UTC time of day>-<sequence>`, e.g. `fl-142305123-17`.
//! The sequence number alone guarantees uniqueness within a process; the
//! time prefix makes it easy to line an ID up with surrounding log output.
//! The registry also compares IDs to tell a record apart from a newer one
//! that replaced it under the same fingerprint.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

static SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Mint a new flight ID.
pub fn generate_flight_id() -> String {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("fl-{}-{seq}", Utc::now().format("%H%M%S%3f"))
}

/// Label for one attempt of a flight, e.g. `fl-142305123-17#2/3`.
///
/// `attempt` is 1-based and `total` is the most attempts the flight can make.
pub fn attempt_label(flight_id: &str, attempt: u32, total: u32) -> String {
    format!("{flight_id}#{attempt}/{total}")
}
