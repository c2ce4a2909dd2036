//! URL normalization and request fingerprints.
//!
//! Two submissions coalesce when their normalized URLs hash to the same
//! [`Fingerprint`]. Method, headers, and body are not part of the identity,
//! so a `POST` and a `GET` to the same URL share one flight.

use crate::error::ValidationError;
use sha2::{Digest, Sha256};
use std::fmt;
use url::Url;

/// An absolute `https` URL produced by [`NormalizedUrl::parse`].
///
/// Plain `http` input is upgraded to `https`; every other scheme is
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl(Url);

impl NormalizedUrl {
    /// Trim, parse, and upgrade `raw`. Rejects empty, relative, and
    /// non-http(s) URLs.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyUrl);
        }

        let mut url = Url::parse(trimmed).map_err(|e| ValidationError::InvalidUrl {
            url: trimmed.to_string(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "https" => {}
            "http" => {
                url.set_scheme("https")
                    .map_err(|()| ValidationError::InvalidUrl {
                        url: trimmed.to_string(),
                        reason: "cannot upgrade scheme to https".into(),
                    })?;
            }
            other => return Err(ValidationError::UnsupportedScheme(other.to_string())),
        }

        Ok(Self(url))
    }

    /// Canonical serialization, as sent on the wire.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The parsed URL.
    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hex-encoded SHA-256 of a normalized URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint a raw URL string.
    ///
    /// Applies the same normalization as submission. Text that does not
    /// parse as a URL is hashed as-is after trimming and the `http://` to
    /// `https://` rewrite, so this never fails.
    pub fn compute(url: &str) -> Self {
        match NormalizedUrl::parse(url) {
            Ok(normalized) => Self::of(&normalized),
            Err(_) => Self::digest(&upgrade_prefix(url.trim())),
        }
    }

    /// Fingerprint an already-validated URL.
    pub fn of(url: &NormalizedUrl) -> Self {
        Self::digest(url.as_str())
    }

    fn digest(text: &str) -> Self {
        Self(hex::encode(Sha256::digest(text.as_bytes())))
    }

    /// Full 64-character hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines.
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn upgrade_prefix(text: &str) -> String {
    match text.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_is_upgraded_to_https() {
        let url = NormalizedUrl::parse("http://example.com/a").unwrap();
        assert_eq!(url.as_str(), "https://example.com/a");
    }

    #[test]
    fn scheme_choice_does_not_change_identity() {
        assert_eq!(
            Fingerprint::compute("http://example.com/a"),
            Fingerprint::compute("https://example.com/a")
        );
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(
            Fingerprint::compute("  https://example.com/a "),
            Fingerprint::compute("https://example.com/a")
        );
    }

    #[test]
    fn different_paths_differ() {
        assert_ne!(
            Fingerprint::compute("https://example.com/a"),
            Fingerprint::compute("https://example.com/b")
        );
    }

    #[test]
    fn fingerprint_is_sha256_hex() {
        let fp = Fingerprint::compute("https://example.com/a");
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(fp.short().len(), 12);
    }

    #[test]
    fn strict_and_lenient_agree_on_valid_urls() {
        let url = NormalizedUrl::parse("http://example.com/x?q=1").unwrap();
        assert_eq!(Fingerprint::of(&url), Fingerprint::compute("http://example.com/x?q=1"));
    }

    #[test]
    fn unparseable_text_still_fingerprints() {
        assert_eq!(
            Fingerprint::compute("http://not a url"),
            Fingerprint::compute("https://not a url")
        );
    }

    #[test]
    fn empty_url_rejected() {
        assert_eq!(NormalizedUrl::parse("   "), Err(ValidationError::EmptyUrl));
    }

    #[test]
    fn relative_url_rejected() {
        assert!(matches!(
            NormalizedUrl::parse("/just/a/path"),
            Err(ValidationError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn non_http_scheme_rejected() {
        assert_eq!(
            NormalizedUrl::parse("ftp://example.com/file"),
            Err(ValidationError::UnsupportedScheme("ftp".into()))
        );
    }
}
