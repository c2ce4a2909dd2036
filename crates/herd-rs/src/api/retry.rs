//! Fixed-delay retry policy.
//!
//! A flight makes at most `max_attempts + 1` transport calls. Only transport
//! errors and non-2xx responses are retried; a 2xx other than 200 is final.

use crate::error::ValidationError;
use std::time::Duration;

/// Retry behavior for one flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = fail on the first error).
    pub max_attempts: u32,
    /// Wait between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// A single attempt with no retries.
    pub fn none() -> Self {
        Self::default()
    }

    /// Policy with `max_attempts` retries and the default delay.
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Replace the delay between attempts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Build a policy from a delay in (possibly fractional) seconds.
    pub fn from_secs_f64(max_attempts: u32, delay_seconds: f64) -> Result<Self, ValidationError> {
        if !delay_seconds.is_finite() || delay_seconds < 0.0 {
            return Err(ValidationError::InvalidDelay(delay_seconds));
        }
        Ok(Self {
            max_attempts,
            delay: Duration::from_secs_f64(delay_seconds),
        })
    }

    /// Whether another attempt should follow a failed attempt number
    /// `attempt` (0-indexed).
    pub fn should_retry(&self, attempt: u32, kind: FailureKind) -> bool {
        kind.is_retryable() && attempt < self.max_attempts
    }

    /// Wait before the attempt after `attempt`. Fixed, no backoff.
    pub fn delay_for(&self, _attempt: u32) -> Duration {
        self.delay
    }

    /// Upper bound on transport calls.
    pub fn total_attempts(&self) -> u32 {
        self.max_attempts.saturating_add(1)
    }
}

/// Classification of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// No response arrived (connect error, timeout).
    Transport,
    /// A non-2xx response arrived.
    Protocol,
    /// A 2xx response other than 200.
    Semantic,
}

impl FailureKind {
    /// Transport and protocol failures may succeed on another attempt.
    pub fn is_retryable(self) -> bool {
        matches!(self, FailureKind::Transport | FailureKind::Protocol)
    }

    /// Upper-case tag used in end-of-error details.
    pub fn label(self) -> &'static str {
        match self {
            FailureKind::Transport => "TRANSPORT",
            FailureKind::Protocol => "PROTOCOL",
            FailureKind::Semantic => "SEMANTIC",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_no_retries() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 0);
        assert_eq!(policy.delay, Duration::from_secs(1));
        assert!(!policy.should_retry(0, FailureKind::Transport));
        assert_eq!(policy.total_attempts(), 1);
    }

    #[test]
    fn with_attempts_sets_count() {
        let policy = RetryPolicy::with_attempts(3);
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.total_attempts(), 4);
    }

    #[test]
    fn retries_until_budget_spent() {
        let policy = RetryPolicy::with_attempts(2);
        assert!(policy.should_retry(0, FailureKind::Protocol));
        assert!(policy.should_retry(1, FailureKind::Protocol));
        assert!(!policy.should_retry(2, FailureKind::Protocol));
    }

    #[test]
    fn semantic_failures_never_retry() {
        let policy = RetryPolicy::with_attempts(5);
        assert!(!policy.should_retry(0, FailureKind::Semantic));
    }

    #[test]
    fn delay_is_fixed() {
        let policy = RetryPolicy::with_attempts(5).with_delay(Duration::from_millis(300));
        assert_eq!(policy.delay_for(0), policy.delay_for(4));
        assert_eq!(policy.delay_for(4), Duration::from_millis(300));
    }

    #[test]
    fn from_secs_rejects_bad_delays() {
        assert!(RetryPolicy::from_secs_f64(1, f64::NAN).is_err());
        assert!(RetryPolicy::from_secs_f64(1, f64::INFINITY).is_err());
        assert!(RetryPolicy::from_secs_f64(1, -0.5).is_err());
        assert_eq!(
            RetryPolicy::from_secs_f64(1, 0.5).unwrap().delay,
            Duration::from_millis(500)
        );
    }
}
