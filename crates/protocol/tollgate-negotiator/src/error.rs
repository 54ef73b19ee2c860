//! Negotiation errors.

use thiserror::Error;
use tollgate_types::{ErrorCategory, ErrorCode, NetworkId};

/// Result type for negotiations.
pub type NegotiationResult<T> = Result<T, NegotiationError>;

/// Result type for signer operations.
pub type SignerResult<T> = Result<T, SignerError>;

/// Errors reported by a [`Signer`](crate::Signer).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    /// The user declined to sign.
    #[error("user rejected the signature request")]
    Rejected,

    /// The user declined to switch network.
    #[error("user rejected the network switch")]
    NetworkSwitchRejected,

    /// No signer is connected, or it failed.
    #[error("signer unavailable: {0}")]
    Unavailable(String),
}

/// Errors talking to the resource server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection or protocol failure.
    #[error("network error: {0}")]
    Network(String),

    /// The request timed out.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The URL cannot be requested.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_builder() {
            Self::InvalidUrl(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Why a negotiation did not end in a granted resource.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NegotiationError {
    // =========================================================================
    // Server behaviour
    // =========================================================================
    /// The server answered with neither 2xx nor 402.
    #[error("unexpected HTTP status {status}")]
    UnexpectedStatus {
        /// The status code
        status: u16,
    },

    /// Talking to the server failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A 402 body could not be decoded.
    #[error("malformed payment challenge: {0}")]
    MalformedChallenge(String),

    // =========================================================================
    // Proof building (user-mediated)
    // =========================================================================
    /// The user declined to switch to the required network.
    #[error("network switch to {network} was rejected")]
    NetworkSwitchRejected {
        /// The network the challenge requires
        network: NetworkId,
    },

    /// The signer cannot express the required network.
    #[error("signer does not support network {network}")]
    UnsupportedNetwork {
        /// The network the challenge requires
        network: NetworkId,
    },

    /// The user declined to sign the payment.
    #[error("payment signature was rejected")]
    ProofRejected,

    /// No signer is available.
    #[error("signer unavailable: {0}")]
    SignerUnavailable(String),

    /// The signer did not answer within the challenge's timeout.
    #[error("signer did not respond within {seconds}s")]
    SignerTimeout {
        /// The bound that elapsed
        seconds: u64,
    },

    /// The negotiation was cancelled.
    #[error("negotiation cancelled")]
    Cancelled,

    // =========================================================================
    // Verification
    // =========================================================================
    /// The server kept rejecting the payment after the retry budget.
    #[error("payment not accepted after {attempts} attempt(s): {code}")]
    Verification {
        /// The last error code the server reported
        code: ErrorCode,
        /// Number of proofs presented
        attempts: u32,
    },
}

impl NegotiationError {
    /// The failure category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnexpectedStatus { .. } | Self::MalformedChallenge(_) => {
                ErrorCategory::UnexpectedStatus
            }
            Self::Transport(_) => ErrorCategory::TransientInfra,
            Self::NetworkSwitchRejected { .. }
            | Self::UnsupportedNetwork { .. }
            | Self::ProofRejected
            | Self::SignerUnavailable(_)
            | Self::SignerTimeout { .. }
            | Self::Cancelled => ErrorCategory::ProofBuild,
            Self::Verification { code, .. } => match code.category() {
                ErrorCategory::Challenge => ErrorCategory::Verification,
                other => other,
            },
        }
    }

    /// Get a user-friendly suggestion for recovering from this error.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::UnexpectedStatus { .. } => "The server did not ask for payment; check the URL",
            Self::Transport(_) => "Check network connectivity to the server",
            Self::MalformedChallenge(_) => "The server's payment challenge is not valid x402",
            Self::NetworkSwitchRejected { .. } => {
                "Approve the network switch in your wallet, or switch manually"
            }
            Self::UnsupportedNetwork { .. } => "Use a wallet that supports the required network",
            Self::ProofRejected => "Approve the payment in your wallet to continue",
            Self::SignerUnavailable(_) => "Connect a wallet and try again",
            Self::SignerTimeout { .. } => "Respond to the wallet prompt sooner and try again",
            Self::Cancelled => "Start the request again when ready",
            Self::Verification { code, .. } => code.suggestion(),
        }
    }

    pub(crate) fn from_signer(error: SignerError, network: &NetworkId) -> Self {
        match error {
            SignerError::Rejected => Self::ProofRejected,
            SignerError::NetworkSwitchRejected => Self::NetworkSwitchRejected {
                network: network.clone(),
            },
            SignerError::Unavailable(reason) => Self::SignerUnavailable(reason),
        }
    }
}
