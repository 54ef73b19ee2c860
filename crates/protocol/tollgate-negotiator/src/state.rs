//! Negotiation states.

use tollgate_types::{ErrorCategory, PaymentRequirements};

/// Where a negotiation currently is.
///
/// Published on every transition; UIs render it and never drive it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NegotiationState {
    /// Nothing in flight.
    #[default]
    Idle,
    /// The unauthenticated request is in flight.
    Requesting,
    /// A 402 arrived with these requirements.
    ChallengeReceived {
        /// Requirements from the challenge
        requirements: Box<PaymentRequirements>,
    },
    /// Waiting on the signer (network switch or signature).
    BuildingProof {
        /// Requirements being paid
        requirements: Box<PaymentRequirements>,
    },
    /// The request carrying a proof is in flight.
    Retrying {
        /// Proofs presented so far, including this one
        attempt: u32,
    },
    /// The resource was served.
    Granted,
    /// The negotiation failed.
    Failed {
        /// What kind of failure
        category: ErrorCategory,
    },
}

impl NegotiationState {
    /// Whether this state ends a negotiation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Granted | Self::Failed { .. })
    }

    /// Short name for logs and UIs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Requesting => "requesting",
            Self::ChallengeReceived { .. } => "challenge-received",
            Self::BuildingProof { .. } => "building-proof",
            Self::Retrying { .. } => "retrying",
            Self::Granted => "granted",
            Self::Failed { .. } => "failed",
        }
    }

    /// The requirements held in this state, if any.
    pub fn requirements(&self) -> Option<&PaymentRequirements> {
        match self {
            Self::ChallengeReceived { requirements } | Self::BuildingProof { requirements } => {
                Some(requirements.as_ref())
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Retrying { attempt } => write!(f, "retrying (attempt {})", attempt),
            Self::Failed { category } => write!(f, "failed ({})", category),
            other => f.write_str(other.name()),
        }
    }
}
