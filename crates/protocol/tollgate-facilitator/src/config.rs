//! Facilitator client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tollgate_types::NetworkTagFormat;
use url::Url;

use crate::error::{FacilitatorError, FacilitatorResult};

/// Public x402.org facilitator (testnets only).
pub const DEFAULT_FACILITATOR_URL: &str = "https://x402.org/facilitator";

/// Default HTTP timeout for facilitator requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for the HTTP facilitator client.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FacilitatorConfig {
    /// Base URL; `/verify`, `/settle` and `/supported` are appended.
    pub url: String,
    /// Bearer credential sent with every request.
    pub api_key: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Transport retry policy.
    pub retry: RetryConfig,
    /// Spelling of `paymentRequirements.network` in outbound requests.
    /// x402 v1 facilitators expect legacy names.
    pub network_format: NetworkTagFormat,
}

impl FacilitatorConfig {
    /// Configuration for a facilitator at `url` with a credential.
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Whether a non-blank credential is configured.
    pub fn has_credential(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> FacilitatorResult<()> {
        let url = Url::parse(&self.url)
            .map_err(|e| FacilitatorError::config(format!("invalid url '{}': {}", self.url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FacilitatorError::config(format!(
                "url must be http(s), got '{}'",
                url.scheme()
            )));
        }
        if self.timeout_secs == 0 {
            return Err(FacilitatorError::config("timeout_secs must be positive"));
        }
        if self.retry.max_attempts == 0 {
            return Err(FacilitatorError::config("retry.max_attempts must be at least 1"));
        }
        Ok(())
    }
}

impl Default for FacilitatorConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FACILITATOR_URL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry: RetryConfig::default(),
            network_format: NetworkTagFormat::LegacyName,
        }
    }
}

impl std::fmt::Debug for FacilitatorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacilitatorConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("retry", &self.retry)
            .field("network_format", &self.network_format)
            .finish()
    }
}

/// Retry policy configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Base delay between retries (milliseconds in config files)
    #[serde(with = "millis_serde")]
    pub base_delay: Duration,
    /// Maximum delay between retries (milliseconds in config files)
    #[serde(with = "millis_serde")]
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(2),
        }
    }
}

/// Serde helper for Duration as integer milliseconds.
mod millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        let config = FacilitatorConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.has_credential());
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = FacilitatorConfig::new("ftp://example.com", "key");
        assert!(config.validate().is_err());

        config.url = "not a url".into();
        assert!(config.validate().is_err());

        config.url = "https://facilitator.example.com".into();
        config.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_credential_is_missing() {
        let config = FacilitatorConfig::new("https://facilitator.example.com", "   ");
        assert!(!config.has_credential());
    }

    #[test]
    fn test_debug_redacts_credential() {
        let config = FacilitatorConfig::new("https://facilitator.example.com", "sk_live_secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk_live_secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_network_format_from_config() {
        assert_eq!(
            FacilitatorConfig::default().network_format,
            NetworkTagFormat::LegacyName
        );
        let config: FacilitatorConfig =
            serde_json::from_str(r#"{"network_format":"caip2"}"#).unwrap();
        assert_eq!(config.network_format, NetworkTagFormat::Caip2);
    }

    #[test]
    fn test_retry_config_millis() {
        let config: RetryConfig =
            serde_json::from_str(r#"{"max_attempts":5,"base_delay":100,"max_delay":1000}"#)
                .unwrap();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.base_delay, Duration::from_millis(100));

        let partial: RetryConfig = serde_json::from_str(r#"{"max_attempts":2}"#).unwrap();
        assert_eq!(partial.max_delay, RetryConfig::default().max_delay);
    }
}
