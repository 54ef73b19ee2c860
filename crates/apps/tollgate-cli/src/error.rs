//! CLI error types.

use thiserror::Error;
use tollgate_types::ErrorCategory;

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;

/// CLI error enum wrapping all crate errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Wire format error.
    #[error("{0}")]
    Codec(#[from] tollgate_types::CodecError),

    /// Resource guard error.
    #[error("{0}")]
    Guard(#[from] tollgate_guard::GuardError),

    /// Facilitator error.
    #[error("{0}")]
    Facilitator(#[from] tollgate_facilitator::FacilitatorError),

    /// Negotiation error.
    #[error("{0}")]
    Negotiation(#[from] tollgate_negotiator::NegotiationError),

    /// IO error.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// User-facing error with actionable message.
    #[error("{0}")]
    User(String),
}

impl From<tollgate_negotiator::TransportError> for CliError {
    fn from(e: tollgate_negotiator::TransportError) -> Self {
        Self::Negotiation(e.into())
    }
}

impl CliError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a user-facing error.
    pub fn user(msg: impl Into<String>) -> Self {
        Self::User(msg.into())
    }

    /// The failure category, for errors that have one.
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Config(_) | Self::Toml(_) => Some(ErrorCategory::Configuration),
            Self::Codec(_) => Some(ErrorCategory::Configuration),
            Self::Guard(e) => Some(e.category()),
            Self::Facilitator(e) => Some(e.category()),
            Self::Negotiation(e) => Some(e.category()),
            Self::Io(_) | Self::Json(_) | Self::User(_) => None,
        }
    }

    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            Some(ErrorCategory::Configuration) => 3,
            Some(ErrorCategory::Challenge) => 4,
            Some(ErrorCategory::ProofBuild) => 5,
            Some(ErrorCategory::Verification) => 6,
            Some(ErrorCategory::TransientInfra) => 7,
            Some(ErrorCategory::UnexpectedStatus) => 8,
            None => match self {
                Self::Io(_) => 9,
                Self::Json(_) => 10,
                _ => 1,
            },
        }
    }

    /// A recovery hint, if one applies.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Config(_) | Self::Toml(_) => {
                Some("Check tollgate.toml or pass --config with the right path")
            }
            Self::Codec(_) => Some("Networks are CAIP-2 identifiers such as eip155:8453"),
            Self::Guard(e) => Some(e.suggestion()),
            Self::Facilitator(e) => Some(e.suggestion()),
            Self::Negotiation(e) => Some(e.suggestion()),
            Self::Io(_) | Self::Json(_) | Self::User(_) => None,
        }
    }
}
