//! The transport seam.
//!
//! [`Transport`] performs exactly one network attempt. The orchestrator owns
//! retries, coalescing, and delivery; a transport only reports what happened
//! on the wire. [`ReqwestTransport`] is the production implementation. Tests
//! inject scripted transports.

use crate::error::TransportError;
use crate::request::Method;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Boxed future returned by [`Transport::send`].
///
/// Boxing keeps the trait dyn-compatible so an orchestrator can hold an
/// `Arc<dyn Transport>`.
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + Send + 'a>>;

/// One wire-level request, already validated and normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub content_type: Option<String>,
}

/// Status code and body text of any HTTP response, success or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    /// Response with the given status and body text.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs one network attempt.
pub trait Transport: Send + Sync {
    /// Send `request` once. Any HTTP response, including 4xx/5xx, is `Ok`.
    /// `Err` means no response arrived.
    fn send<'a>(&'a self, request: &'a TransportRequest) -> TransportFuture<'a>;
}

// ── Reqwest ────────────────────────────────────────────────────────

/// [`Transport`] backed by a shared `reqwest::Client`.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client with the given per-attempt timeout and user agent.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn execute(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            if let Some(ct) = &request.content_type {
                builder = builder.header(reqwest::header::CONTENT_TYPE, ct.as_str());
            }
            trace!("request body: {} bytes", body.len());
            builder = builder.body(body.clone());
        }

        let start = Instant::now();
        let resp = builder.send().await.map_err(classify)?;
        let status = resp.status();
        let body = resp.text().await.map_err(classify)?;

        debug!(
            "HTTP {} {} -> {} in {:.2}s ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            start.elapsed().as_secs_f64(),
            body.len()
        );

        Ok(TransportResponse {
            status: status.as_u16(),
            body,
        })
    }
}

impl Transport for ReqwestTransport {
    fn send<'a>(&'a self, request: &'a TransportRequest) -> TransportFuture<'a> {
        Box::pin(self.execute(request))
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}

/// Human-readable reason for an HTTP status code.
pub fn status_reason(code: u16) -> &'static str {
    reqwest::StatusCode::from_u16(code)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown Error")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_range() {
        assert!(TransportResponse::new(200, "").is_success());
        assert!(TransportResponse::new(204, "").is_success());
        assert!(!TransportResponse::new(301, "").is_success());
        assert!(!TransportResponse::new(500, "").is_success());
    }

    #[test]
    fn status_reasons() {
        assert_eq!(status_reason(404), "Not Found");
        assert_eq!(status_reason(429), "Too Many Requests");
        assert_eq!(status_reason(502), "Bad Gateway");
        assert_eq!(status_reason(599), "Unknown Error");
    }

    #[test]
    fn reqwest_transport_builds() {
        assert!(ReqwestTransport::new(Duration::from_secs(5), "herd-test/0.1").is_ok());
    }

    #[tokio::test]
    async fn connection_refused_is_an_error() {
        let transport = ReqwestTransport::new(Duration::from_secs(2), "herd-test/0.1").unwrap();
        let request = TransportRequest {
            method: Method::Get,
            url: "http://127.0.0.1:9/".into(),
            headers: Vec::new(),
            body: None,
            content_type: None,
        };
        assert!(transport.send(&request).await.is_err());
    }
}
