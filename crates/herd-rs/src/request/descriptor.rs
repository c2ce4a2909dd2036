//! Immutable request descriptors.
//!
//! A [`RequestDescriptor`] is assembled through [`RequestBuilder`] and never
//! changes afterwards. Validation is deferred to submission time so that a
//! rejected descriptor can still be reported through the caller's hooks.

use crate::api::retry::RetryPolicy;
use crate::error::ValidationError;
use crate::request::fingerprint::NormalizedUrl;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// HTTP verbs the orchestrator can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    #[default]
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    /// Upper-case wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Whether a body attached to this method is sent on the wire.
    pub fn sends_body(self) -> bool {
        !matches!(self, Method::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Method::Get),
            "post" => Ok(Method::Post),
            "patch" => Ok(Method::Patch),
            "delete" => Ok(Method::Delete),
            other => Err(format!("unknown method '{other}' (expected get, post, patch, delete)")),
        }
    }
}

/// What happens when a submission finds a flight already running for its
/// fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coalescing {
    /// Attach to the running flight and receive its outcome.
    #[default]
    Share,
    /// Cancel the running flight and start a fresh one.
    Preempt,
}

/// Everything needed to issue and orchestrate one logical request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    method: Method,
    url: String,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    content_type: Option<String>,
    max_attempts: u32,
    delay_seconds: f64,
    coalescing: Coalescing,
}

/// Output of [`RequestDescriptor::validate`].
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub url: NormalizedUrl,
    pub retry: RetryPolicy,
    /// The body that will actually be sent. Always `None` for GET.
    pub body: Option<Vec<u8>>,
}

impl RequestDescriptor {
    /// Start building a request with any method.
    pub fn builder(method: Method, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(method, url)
    }

    /// Shorthand for `builder(Method::Get, url)`.
    pub fn get(url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(Method::Get, url)
    }

    /// Shorthand for `builder(Method::Post, url)`.
    pub fn post(url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(Method::Post, url)
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// The URL exactly as given, before normalization.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Headers in insertion order, duplicates included.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Raw body as given. GET bodies are kept here but never sent.
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Retries after the first attempt.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay between attempts, unvalidated.
    pub fn delay_seconds(&self) -> f64 {
        self.delay_seconds
    }

    /// Behavior when a flight for the same URL is already running.
    pub fn coalescing(&self) -> Coalescing {
        self.coalescing
    }

    /// Check the descriptor and resolve its URL and retry policy.
    ///
    /// Order: URL presence and shape, then the content-type requirement,
    /// then the retry delay.
    pub fn validate(&self) -> Result<ValidatedRequest, ValidationError> {
        let url = NormalizedUrl::parse(&self.url)?;

        let body = match (&self.body, self.method.sends_body()) {
            (Some(_), false) => {
                debug!(method = %self.method, url = %url, "ignoring body on GET request");
                None
            }
            (Some(body), true) => {
                if self.content_type.as_deref().is_none_or(|ct| ct.trim().is_empty()) {
                    return Err(ValidationError::MissingContentType {
                        method: self.method,
                    });
                }
                Some(body.clone())
            }
            (None, _) => None,
        };

        let retry = RetryPolicy::from_secs_f64(self.max_attempts, self.delay_seconds)?;

        Ok(ValidatedRequest { url, retry, body })
    }
}

/// Builder for [`RequestDescriptor`].
///
/// ```ignore
/// let req = RequestDescriptor::post("https://api.example.com/items")
///     .header("Authorization", "Bearer abc")
///     .body(r#"{"name":"x"}"#)
///     .content_type("application/json")
///     .max_attempts(2)
///     .build();
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct RequestBuilder {
    inner: RequestDescriptor,
}

impl RequestBuilder {
    /// Builder with default retry settings and `Share` coalescing.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        let defaults = RetryPolicy::default();
        Self {
            inner: RequestDescriptor {
                method,
                url: url.into(),
                headers: Vec::new(),
                body: None,
                content_type: None,
                max_attempts: defaults.max_attempts,
                delay_seconds: defaults.delay.as_secs_f64(),
                coalescing: Coalescing::default(),
            },
        }
    }

    /// Append a header. Repeated names are all sent.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner.headers.push((name.into(), value.into()));
        self
    }

    /// Append several headers at once.
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.inner
            .headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set the request body. Requires a content type unless the method is GET.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.inner.body = Some(body.into());
        self
    }

    /// Set the `Content-Type` sent with the body.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.inner.content_type = Some(content_type.into());
        self
    }

    /// Retries after the first attempt. `0` means a single attempt.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.inner.max_attempts = max_attempts;
        self
    }

    /// Delay between attempts in seconds. Checked at submission.
    pub fn delay_seconds(mut self, seconds: f64) -> Self {
        self.inner.delay_seconds = seconds;
        self
    }

    /// Delay between attempts as a [`Duration`].
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.inner.delay_seconds = delay.as_secs_f64();
        self
    }

    /// Take the attempt count and delay from an existing policy.
    pub fn retry(mut self, policy: &RetryPolicy) -> Self {
        self.inner.max_attempts = policy.max_attempts;
        self.inner.delay_seconds = policy.delay.as_secs_f64();
        self
    }

    /// Choose between joining and preempting a running flight.
    pub fn coalescing(mut self, coalescing: Coalescing) -> Self {
        self.inner.coalescing = coalescing;
        self
    }

    /// Finish the descriptor. Validation happens at submission.
    pub fn build(self) -> RequestDescriptor {
        self.inner
    }
}
