//! Facilitator client errors.
//!
//! Every variant is an infrastructure failure. A proof the facilitator judged
//! and rejected is not an error; it is a [`SettlementOutcome`] with
//! `settled == false`.
//!
//! [`SettlementOutcome`]: crate::SettlementOutcome

use thiserror::Error;
use tollgate_types::ErrorCategory;

/// Result type for facilitator operations.
pub type FacilitatorResult<T> = Result<T, FacilitatorError>;

/// Errors talking to a facilitator.
#[derive(Debug, Error)]
pub enum FacilitatorError {
    /// Network error. `unsent` is true when the request never left the
    /// process (connection refused, DNS failure).
    #[error("facilitator network error: {reason}")]
    Network {
        /// What went wrong
        reason: String,
        /// Whether the request was never transmitted
        unsent: bool,
    },

    /// The request timed out.
    #[error("facilitator timed out: {0}")]
    Timeout(String),

    /// The facilitator answered with a non-success status.
    #[error("facilitator returned HTTP {status}: {body}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Response body, truncated
        body: String,
    },

    /// The response could not be parsed.
    #[error("failed to decode facilitator response: {0}")]
    Decode(String),

    /// Client configuration is unusable.
    #[error("facilitator configuration error: {0}")]
    Config(String),
}

impl FacilitatorError {
    /// Create a network error for a request that may have been sent.
    pub fn network(reason: impl Into<String>) -> Self {
        Self::Network {
            reason: reason.into(),
            unsent: false,
        }
    }

    /// Create a network error for a request that was never sent.
    pub fn connect(reason: impl Into<String>) -> Self {
        Self::Network {
            reason: reason.into(),
            unsent: true,
        }
    }

    /// Create a Timeout error.
    pub fn timeout(reason: impl Into<String>) -> Self {
        Self::Timeout(reason.into())
    }

    /// Create an Http error, truncating long bodies.
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        let mut body = body.into();
        if body.len() > 512 {
            let mut cut = 512;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        Self::Http { status, body }
    }

    /// Create a Decode error.
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode(reason.into())
    }

    /// Create a Config error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout(_) => true,
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            Self::Decode(_) | Self::Config(_) => false,
        }
    }

    /// Whether the request provably never reached the facilitator.
    ///
    /// Only such failures may be re-sent for a settlement call.
    pub fn is_unsent(&self) -> bool {
        matches!(self, Self::Network { unsent: true, .. })
    }

    /// The failure category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Configuration,
            _ => ErrorCategory::TransientInfra,
        }
    }

    /// Get a user-friendly suggestion for recovering from this error.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::Network { .. } => "Check network connectivity to the facilitator",
            Self::Timeout(_) => "The facilitator is slow to respond; retry shortly",
            Self::Http { status: 401, .. } | Self::Http { status: 403, .. } => {
                "Check the facilitator API key"
            }
            Self::Http { .. } => "Check the facilitator status page",
            Self::Decode(_) => "The facilitator speaks an incompatible protocol version",
            Self::Config(_) => "Check the [facilitator] section of the configuration",
        }
    }
}

impl From<reqwest::Error> for FacilitatorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            Self::connect(e.to_string())
        } else if e.is_timeout() {
            Self::timeout(e.to_string())
        } else if e.is_decode() {
            Self::decode(e.to_string())
        } else if e.is_builder() {
            Self::config(e.to_string())
        } else {
            Self::network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(FacilitatorError::network("reset").is_retryable());
        assert!(FacilitatorError::connect("refused").is_retryable());
        assert!(FacilitatorError::timeout("30s").is_retryable());
        assert!(FacilitatorError::http(503, "").is_retryable());
        assert!(FacilitatorError::http(429, "").is_retryable());
        assert!(!FacilitatorError::http(400, "").is_retryable());
        assert!(!FacilitatorError::decode("bad json").is_retryable());
        assert!(!FacilitatorError::config("no url").is_retryable());
    }

    #[test]
    fn test_unsent_only_for_connect() {
        assert!(FacilitatorError::connect("refused").is_unsent());
        assert!(!FacilitatorError::network("reset").is_unsent());
        assert!(!FacilitatorError::timeout("30s").is_unsent());
    }

    #[test]
    fn test_http_body_truncated() {
        let err = FacilitatorError::http(500, "é".repeat(400));
        match err {
            FacilitatorError::Http { body, .. } => assert!(body.len() <= 512),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_category() {
        assert_eq!(
            FacilitatorError::timeout("x").category(),
            ErrorCategory::TransientInfra
        );
        assert_eq!(
            FacilitatorError::config("x").category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            FacilitatorError::http(401, "").suggestion(),
            "Check the facilitator API key"
        );
    }
}
