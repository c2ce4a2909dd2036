//! Runtime configuration, loadable from `herd.json`.
//!
//! ```json
//! {
//!   "timeout_secs": 30,
//!   "user_agent": "herd/0.1",
//!   "default_max_attempts": 2,
//!   "default_delay_secs": 0.5
//! }
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use crate::api::retry::RetryPolicy;
use crate::api::transport::ReqwestTransport;
use crate::error::{HerdError, ValidationError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Default config file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "herd.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HerdConfig {
    /// Per-attempt transport timeout in seconds. Fractions are allowed;
    /// the value must be positive.
    pub timeout_secs: f64,
    /// `User-Agent` header sent with every attempt.
    pub user_agent: String,
    /// Retries applied to requests that do not set their own.
    pub default_max_attempts: u32,
    /// Delay between attempts, in seconds.
    pub default_delay_secs: f64,
}

impl Default for HerdConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30.0,
            user_agent: concat!("herd/", env!("CARGO_PKG_VERSION")).to_string(),
            default_max_attempts: 0,
            default_delay_secs: 1.0,
        }
    }
}

impl HerdConfig {
    /// Load from `path`. A missing file yields defaults; an unparseable file
    /// logs a warning and yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                warn!("Failed to parse {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => {
                debug!("no config at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Strict parse of a JSON document.
    pub fn parse(json: &str) -> Result<Self, HerdError> {
        serde_json::from_str(json).map_err(|e| HerdError::Config(e.to_string()))
    }

    /// Set the per-attempt timeout. Sub-second precision is kept.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs_f64();
        self
    }

    /// Set the `User-Agent` header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the default retry count for requests.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.default_max_attempts = max_attempts;
        self
    }

    /// Set the default delay between attempts, in seconds.
    pub fn with_delay_secs(mut self, delay_secs: f64) -> Self {
        self.default_delay_secs = delay_secs;
        self
    }

    /// The per-attempt timeout. Zero, negative, and non-finite values are
    /// rejected, since they would make every attempt time out.
    pub fn timeout(&self) -> Result<Duration, HerdError> {
        if !self.timeout_secs.is_finite() || self.timeout_secs <= 0.0 {
            return Err(HerdError::Config(format!(
                "timeout_secs must be a positive number of seconds, got {}",
                self.timeout_secs
            )));
        }
        Ok(Duration::from_secs_f64(self.timeout_secs))
    }

    /// Default retry policy for requests that do not set their own.
    pub fn retry_policy(&self) -> Result<RetryPolicy, ValidationError> {
        RetryPolicy::from_secs_f64(self.default_max_attempts, self.default_delay_secs)
    }

    /// Build a [`ReqwestTransport`] with this config's timeout and user agent.
    pub fn transport(&self) -> Result<ReqwestTransport, HerdError> {
        ReqwestTransport::new(self.timeout()?, &self.user_agent)
            .map_err(|e| HerdError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = HerdConfig::default();
        assert_eq!(config.timeout().unwrap(), Duration::from_secs(30));
        assert_eq!(config.default_max_attempts, 0);
        assert_eq!(config.default_delay_secs, 1.0);
        assert!(config.user_agent.starts_with("herd/"));
        assert_eq!(config.retry_policy().unwrap(), RetryPolicy::default());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = HerdConfig::load(dir.path().join("nope.json"));
        assert_eq!(config, HerdConfig::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"default_max_attempts": 3, "default_delay_secs": 0.25}}"#).unwrap();

        let config = HerdConfig::load(file.path());
        assert_eq!(config.default_max_attempts, 3);
        assert_eq!(config.timeout_secs, 30.0);

        let policy = config.retry_policy().unwrap();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay, Duration::from_millis(250));
    }

    #[test]
    fn garbage_file_yields_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert_eq!(HerdConfig::load(file.path()), HerdConfig::default());
    }

    #[test]
    fn strict_parse_reports_errors() {
        assert!(matches!(
            HerdConfig::parse("{\"timeout_secs\": \"soon\"}"),
            Err(HerdError::Config(_))
        ));
    }

    #[test]
    fn sub_second_timeout_is_kept() {
        let config = HerdConfig::default().with_timeout(Duration::from_millis(500));
        assert_eq!(config.timeout().unwrap(), Duration::from_millis(500));
        assert!(config.transport().is_ok());
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = HerdConfig::parse(r#"{"timeout_secs": 0}"#).unwrap();
        assert!(matches!(config.timeout(), Err(HerdError::Config(_))));
        assert!(config.transport().is_err());
        assert!(HerdConfig::default().with_timeout(Duration::ZERO).timeout().is_err());
    }

    #[test]
    fn builders() {
        let config = HerdConfig::default()
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("custom/1")
            .with_max_attempts(4)
            .with_delay_secs(-1.0);
        assert_eq!(config.timeout().unwrap(), Duration::from_secs(5));
        assert_eq!(config.user_agent, "custom/1");
        assert_eq!(config.default_max_attempts, 4);
        assert!(config.retry_policy().is_err());
    }
}
