//! Resource guard errors.

use thiserror::Error;
use tollgate_types::{CodecError, ErrorCategory};

/// Result type for guard operations.
pub type GuardResult<T> = Result<T, GuardError>;

/// Errors the guard reports to the client as a non-402 response.
///
/// Payment failures are not errors here; they are 402 challenges.
#[derive(Debug, Clone, Error)]
pub enum GuardError {
    /// Required server configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The request cannot be bound to a resource (e.g. no Host header).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The resource could not be produced after payment settled.
    #[error("content unavailable: {0}")]
    Content(String),
}

impl GuardError {
    /// Create a Configuration error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }

    /// Create a BadRequest error.
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::BadRequest(reason.into())
    }

    /// Create a Content error.
    pub fn content(reason: impl Into<String>) -> Self {
        Self::Content(reason.into())
    }

    /// The HTTP status this error is answered with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Configuration(_) | Self::Content(_) => 500,
            Self::BadRequest(_) => 400,
        }
    }

    /// The `error` field of the JSON body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration_error",
            Self::BadRequest(_) => "bad_request",
            Self::Content(_) => "content_unavailable",
        }
    }

    /// The failure category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::BadRequest(_) | Self::Content(_) => ErrorCategory::UnexpectedStatus,
        }
    }

    /// Get a user-friendly suggestion for recovering from this error.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::Configuration(_) => {
                "Set the recipient address and facilitator credential, then restart"
            }
            Self::BadRequest(_) => "Send the request with a Host header and a valid path",
            Self::Content(_) => "Check that the resource file exists and is readable",
        }
    }
}

impl From<CodecError> for GuardError {
    fn from(e: CodecError) -> Self {
        Self::BadRequest(e.to_string())
    }
}
