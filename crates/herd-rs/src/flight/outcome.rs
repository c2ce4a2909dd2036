//! Terminal outcomes delivered to subscribers.

use crate::api::transport::{TransportResponse, status_reason};
use crate::error::TransportError;

pub use crate::api::retry::FailureKind;

/// A successful (HTTP 200) response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub code: u16,
    pub body: String,
}

/// A flight that ended without a usable response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    /// Status code, when a response arrived.
    pub code: Option<u16>,
    /// The message passed to the error hook.
    pub message: String,
    /// Response body, when a response arrived.
    pub body: Option<String>,
    pub attempts_made: u32,
}

impl Failure {
    /// The text passed to the end-of-error hook.
    ///
    /// `[RESPONSE]<body>` when the server answered, `[MAXRETRIES]` when the
    /// retry budget ran out without a response, otherwise the failure kind.
    pub fn detail(&self) -> String {
        match &self.body {
            Some(body) => format!("[RESPONSE]{body}"),
            None if self.attempts_made > 1 => "[MAXRETRIES]".to_string(),
            None => format!("[{}]", self.kind.label()),
        }
    }

    pub(crate) fn from_transport(err: &TransportError) -> Self {
        Self {
            kind: FailureKind::Transport,
            code: None,
            message: err.to_string(),
            body: None,
            attempts_made: 0,
        }
    }

    pub(crate) fn from_response(resp: TransportResponse) -> Self {
        let (kind, message) = if resp.is_success() {
            (
                FailureKind::Semantic,
                format!("Wrong response code > {}", resp.status),
            )
        } else {
            (
                FailureKind::Protocol,
                format!("HTTP {} {}", resp.status, status_reason(resp.status)),
            )
        };
        Self {
            kind,
            code: Some(resp.status),
            message,
            body: Some(resp.body),
            attempts_made: 0,
        }
    }
}

/// The single terminal value every subscriber of a flight receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(Response),
    Failure(Failure),
    /// Cancelled by a later `Preempt` submission for the same fingerprint.
    Preempted { attempts_made: u32 },
}

impl Outcome {
    /// Whether the flight got a 200.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// The response, for successful outcomes.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Outcome::Success(r) => Some(r),
            _ => None,
        }
    }

    /// The failure, for failed outcomes.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Failure(f) => Some(f),
            _ => None,
        }
    }

    /// Transport calls made, when known. Successes do not track it.
    pub fn attempts_made(&self) -> Option<u32> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(f) => Some(f.attempts_made),
            Outcome::Preempted { attempts_made } => Some(*attempts_made),
        }
    }
}

/// Sort one transport result into a 200 response or a failure.
pub(crate) fn classify(result: Result<TransportResponse, TransportError>) -> Result<Response, Failure> {
    match result {
        Ok(resp) if resp.status == 200 => Ok(Response {
            code: resp.status,
            body: resp.body,
        }),
        Ok(resp) => Err(Failure::from_response(resp)),
        Err(err) => Err(Failure::from_transport(&err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_200_is_success() {
        let ok = classify(Ok(TransportResponse::new(200, "ok"))).unwrap();
        assert_eq!(ok, Response { code: 200, body: "ok".into() });

        let created = classify(Ok(TransportResponse::new(201, "made"))).unwrap_err();
        assert_eq!(created.kind, FailureKind::Semantic);
        assert_eq!(created.code, Some(201));
        assert_eq!(created.message, "Wrong response code > 201");
    }

    #[test]
    fn non_2xx_is_protocol_failure() {
        let failure = classify(Ok(TransportResponse::new(500, "boom"))).unwrap_err();
        assert_eq!(failure.kind, FailureKind::Protocol);
        assert_eq!(failure.message, "HTTP 500 Internal Server Error");
        assert_eq!(failure.body.as_deref(), Some("boom"));
    }

    #[test]
    fn transport_error_has_no_code() {
        let failure = classify(Err(TransportError::Timeout)).unwrap_err();
        assert_eq!(failure.kind, FailureKind::Transport);
        assert_eq!(failure.code, None);
        assert_eq!(failure.message, "request timed out");
    }

    #[test]
    fn detail_prefers_response_body() {
        let mut failure = classify(Ok(TransportResponse::new(404, "nope"))).unwrap_err();
        failure.attempts_made = 3;
        assert_eq!(failure.detail(), "[RESPONSE]nope");

        let mut failure = classify(Err(TransportError::Timeout)).unwrap_err();
        failure.attempts_made = 1;
        assert_eq!(failure.detail(), "[TRANSPORT]");
        failure.attempts_made = 2;
        assert_eq!(failure.detail(), "[MAXRETRIES]");
    }
}
