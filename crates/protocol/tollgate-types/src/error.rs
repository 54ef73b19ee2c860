//! Error codes and categories shared by the guard and the negotiator.
//!
//! [`ErrorCode`] is the wire vocabulary carried in the `error` field of a 402
//! body. [`ErrorCategory`] is the coarser taxonomy every user-visible failure
//! is reported under.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Wire error codes exchanged between the resource server and the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorCode {
    // =========================================================================
    // Challenge
    // =========================================================================
    /// No proof was presented; this is a normal protocol step.
    PaymentRequired,

    // =========================================================================
    // Verification (facilitator rejected the proof)
    // =========================================================================
    /// Signature over the authorization does not verify.
    InvalidSignature,
    /// Authorized value differs from `maxAmountRequired`.
    AmountMismatch,
    /// Authorization validity window has passed.
    Expired,
    /// The proof was already consumed by a previous settlement.
    AlreadySettled,
    /// Proof was built for a different network.
    NetworkMismatch,
    /// Proof was built for a different resource URL.
    ResourceMismatch,
    /// Proof pays a different recipient.
    RecipientMismatch,
    /// Proof transfers a different asset.
    AssetMismatch,
    /// Proof could not be interpreted at all.
    InvalidPayload,

    // =========================================================================
    // Infrastructure
    // =========================================================================
    /// The facilitator could not be reached; the proof was not judged.
    VerificationUnavailable,
    /// Server configuration is incomplete.
    ConfigurationError,
}

impl ErrorCode {
    /// Map a facilitator-reported reason string to an error code.
    ///
    /// Accepts both our own snake_case codes and the reason names used by
    /// common upstream x402 facilitators. Anything unrecognised is treated as
    /// an invalid payload so that it is still surfaced as a verification error.
    pub fn from_reason(reason: &str) -> Self {
        let reason = reason.trim().to_ascii_lowercase();
        match reason.as_str() {
            "payment_required" => Self::PaymentRequired,
            "invalid_signature"
            | "invalid_exact_evm_payload_signature"
            | "invalid_exact_svm_payload_signature" => Self::InvalidSignature,
            "amount_mismatch"
            | "invalid_exact_evm_payload_authorization_value"
            | "insufficient_funds" => Self::AmountMismatch,
            "expired"
            | "invalid_exact_evm_payload_authorization_valid_before"
            | "invalid_exact_evm_payload_authorization_valid_after" => Self::Expired,
            "already_settled" | "nonce_already_used" | "authorization_already_used" => {
                Self::AlreadySettled
            }
            "network_mismatch" | "invalid_network" | "unsupported_network" => {
                Self::NetworkMismatch
            }
            "resource_mismatch" => Self::ResourceMismatch,
            "recipient_mismatch" | "invalid_exact_evm_payload_recipient_mismatch" => {
                Self::RecipientMismatch
            }
            "asset_mismatch" | "invalid_exact_evm_payload_asset" => Self::AssetMismatch,
            "verification_unavailable" => Self::VerificationUnavailable,
            "configuration_error" => Self::ConfigurationError,
            _ => Self::InvalidPayload,
        }
    }

    /// The wire representation, identical to the serde form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentRequired => "payment_required",
            Self::InvalidSignature => "invalid_signature",
            Self::AmountMismatch => "amount_mismatch",
            Self::Expired => "expired",
            Self::AlreadySettled => "already_settled",
            Self::NetworkMismatch => "network_mismatch",
            Self::ResourceMismatch => "resource_mismatch",
            Self::RecipientMismatch => "recipient_mismatch",
            Self::AssetMismatch => "asset_mismatch",
            Self::InvalidPayload => "invalid_payload",
            Self::VerificationUnavailable => "verification_unavailable",
            Self::ConfigurationError => "configuration_error",
        }
    }

    /// The failure category this code belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::PaymentRequired => ErrorCategory::Challenge,
            Self::VerificationUnavailable => ErrorCategory::TransientInfra,
            Self::ConfigurationError => ErrorCategory::Configuration,
            Self::InvalidSignature
            | Self::AmountMismatch
            | Self::Expired
            | Self::AlreadySettled
            | Self::NetworkMismatch
            | Self::ResourceMismatch
            | Self::RecipientMismatch
            | Self::AssetMismatch
            | Self::InvalidPayload => ErrorCategory::Verification,
        }
    }

    /// Get a user-friendly suggestion for recovering from this error.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::PaymentRequired => "Sign a payment for the returned requirements and retry.",
            Self::InvalidSignature => "Re-sign the payment with the wallet that owns the funds.",
            Self::AmountMismatch => "Pay exactly maxAmountRequired from the latest challenge.",
            Self::Expired => "Request a fresh challenge and sign a new payment.",
            Self::AlreadySettled => "This payment was already used. Sign a new payment.",
            Self::NetworkMismatch => "Switch the wallet to the network named in the challenge.",
            Self::ResourceMismatch => "Sign a payment for this exact resource URL.",
            Self::RecipientMismatch => "Pay the payTo address from the latest challenge.",
            Self::AssetMismatch => "Pay with the asset named in the latest challenge.",
            Self::InvalidPayload => "Check the X-PAYMENT header encoding.",
            Self::VerificationUnavailable => "The payment service is unreachable. Retry shortly.",
            Self::ConfigurationError => "The server is misconfigured. Contact the operator.",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure taxonomy shared by both sides of the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Server misconfiguration. Fatal, never retried.
    Configuration,
    /// A 402 challenge. A normal protocol step, not a failure.
    Challenge,
    /// The user or wallet declined to sign or switch network.
    ProofBuild,
    /// The facilitator rejected the proof.
    Verification,
    /// Network or timeout talking to an upstream service.
    TransientInfra,
    /// The server answered with neither 2xx nor 402.
    UnexpectedStatus,
}

impl ErrorCategory {
    /// Whether trying again later can succeed without a configuration
    /// change or a new decision by the user.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Verification | Self::TransientInfra)
    }

    /// Whether a negotiator may answer this 402 with a freshly built proof.
    ///
    /// Transient failures are excluded: the previous proof may have settled
    /// behind a timeout, and a new proof would pay again.
    pub fn allows_new_proof(&self) -> bool {
        matches!(self, Self::Challenge | Self::Verification)
    }

    /// Human-readable category name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Challenge => "challenge",
            Self::ProofBuild => "proof-build",
            Self::Verification => "verification",
            Self::TransientInfra => "transient-infra",
            Self::UnexpectedStatus => "unexpected-status",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced while encoding or decoding protocol values.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A required field is absent.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A field is present but malformed.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// Field name (wire form)
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// JSON serialization or parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Base64 decoding failed.
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Header bytes are not UTF-8.
    #[error("UTF-8 decode error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl CodecError {
    /// Create an InvalidField error.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}
