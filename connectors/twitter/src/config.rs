//! Harvester configuration.
//!
//! Credentials are opaque strings handed in from outside (flags, environment,
//! or a TOML file). Nothing here validates them; bad credentials surface on the
//! first request.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{TwitterError, TwitterResult};

/// The four OAuth 1.0a user-context secrets.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Consumer key (API key)
    pub consumer_key: String,

    /// Consumer secret (API secret)
    pub consumer_secret: String,

    /// Access token
    pub access_token: String,

    /// Access token secret
    pub access_token_secret: String,
}

impl Credentials {
    /// Bundle the four secrets.
    #[must_use]
    pub fn new(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        access_token: impl Into<String>,
        access_token_secret: impl Into<String>,
    ) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            access_token: access_token.into(),
            access_token_secret: access_token_secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &"[REDACTED]")
            .field("consumer_secret", &"[REDACTED]")
            .field("access_token", &"[REDACTED]")
            .field("access_token_secret", &"[REDACTED]")
            .finish()
    }
}

/// Configuration for the REST client and the streamer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitterConfig {
    /// OAuth 1.0a secrets
    #[serde(default)]
    pub credentials: Credentials,

    /// Base URL for the REST API (default: https://api.twitter.com)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Base URL for the streaming API (default: https://stream.twitter.com)
    #[serde(default = "default_stream_url")]
    pub stream_url: String,

    /// REST request timeout
    #[serde(default = "default_timeout", with = "duration_secs", rename = "timeout_secs")]
    pub timeout: Duration,
}

fn default_api_url() -> String {
    "https://api.twitter.com".into()
}

fn default_stream_url() -> String {
    "https://stream.twitter.com".into()
}

const fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            api_url: default_api_url(),
            stream_url: default_stream_url(),
            timeout: default_timeout(),
        }
    }
}

impl TwitterConfig {
    /// Config with the given secrets and default endpoints.
    #[must_use]
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials,
            ..Self::default()
        }
    }

    /// Parse a TOML document.
    pub fn from_toml_str(input: &str) -> TwitterResult<Self> {
        toml::from_str(input).map_err(|e| TwitterError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> TwitterResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TwitterError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }
}

/// Rate limit information from Twitter API headers.
#[derive(Debug, Clone, Default)]
pub struct RateLimitInfo {
    /// Remaining requests in the current window
    pub remaining: Option<u32>,

    /// Unix timestamp when the rate limit resets
    pub reset: Option<u64>,
}

impl RateLimitInfo {
    /// Parse rate limit info from response headers.
    pub fn from_headers(headers: &reqwest::header::HeaderMap) -> Self {
        Self {
            remaining: headers
                .get("x-rate-limit-remaining")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok()),
            reset: headers
                .get("x-rate-limit-reset")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok()),
        }
    }

    /// Seconds until the window resets, if the reset lies in the future.
    #[must_use]
    pub fn secs_until_reset(&self) -> Option<u64> {
        let reset = self.reset?;
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .ok()?
            .as_secs();

        reset.checked_sub(now).filter(|secs| *secs > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_public_hosts() {
        let config = TwitterConfig::default();
        assert_eq!(config.api_url, "https://api.twitter.com");
        assert_eq!(config.stream_url, "https://stream.twitter.com");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.credentials.consumer_key.is_empty());
    }

    #[test]
    fn parses_toml_with_credentials_table() {
        let config = TwitterConfig::from_toml_str(
            r#"
            api_url = "http://localhost:9000"
            timeout_secs = 5

            [credentials]
            consumer_key = "ck"
            consumer_secret = "cs"
            access_token = "at"
            access_token_secret = "as"
            "#,
        )
        .unwrap();

        assert_eq!(config.api_url, "http://localhost:9000");
        assert_eq!(config.stream_url, "https://stream.twitter.com");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.credentials, Credentials::new("ck", "cs", "at", "as"));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = TwitterConfig::from_toml_str("timeout_secs = \"soon\"").unwrap_err();
        assert!(matches!(err, TwitterError::Config(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = TwitterConfig::load("/nonexistent/harvest.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/harvest.toml"));
    }

    #[test]
    fn debug_redacts_secrets() {
        let creds = Credentials::new("ck-value", "cs-value", "at-value", "as-value");
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("ck-value"));
        assert!(!rendered.contains("as-value"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn rate_limit_reset_in_past_yields_none() {
        let info = RateLimitInfo {
            remaining: Some(0),
            reset: Some(1),
        };
        assert_eq!(info.secs_until_reset(), None);
    }
}
