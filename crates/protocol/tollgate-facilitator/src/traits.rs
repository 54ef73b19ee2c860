//! The facilitator capability the resource guard depends on.

use std::sync::Arc;

use async_trait::async_trait;
use tollgate_types::{ErrorCode, PaymentProof, PaymentRequirements, SettlementReceipt};

use crate::error::FacilitatorResult;

/// Result of one logical verify-and-settle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementOutcome {
    /// Whether funds moved
    pub settled: bool,
    /// Why the proof was rejected
    pub error_code: Option<ErrorCode>,
    /// Receipt for a completed settlement
    pub receipt: Option<SettlementReceipt>,
}

impl SettlementOutcome {
    /// A completed settlement.
    pub fn settled(receipt: SettlementReceipt) -> Self {
        Self {
            settled: true,
            error_code: None,
            receipt: Some(receipt),
        }
    }

    /// A proof the facilitator judged invalid.
    pub fn rejected(code: ErrorCode) -> Self {
        Self {
            settled: false,
            error_code: Some(code),
            receipt: None,
        }
    }
}

/// Verifies payment proofs and settles them.
///
/// Implementations own their transport retries. Each call is one logical
/// settlement attempt: a proof that verifies must never be settled twice,
/// and a proof that was already settled must come back rejected with
/// [`ErrorCode::AlreadySettled`].
///
/// `Err` is reserved for failures to reach a verdict. A rejected proof is
/// `Ok` with `settled == false`.
#[async_trait]
pub trait Facilitator: Send + Sync {
    /// Verify `proof` against `requirements` and, if valid, settle it.
    async fn verify_and_settle(
        &self,
        proof: &PaymentProof,
        requirements: &PaymentRequirements,
    ) -> FacilitatorResult<SettlementOutcome>;
}

#[async_trait]
impl<F: Facilitator + ?Sized> Facilitator for Arc<F> {
    async fn verify_and_settle(
        &self,
        proof: &PaymentProof,
        requirements: &PaymentRequirements,
    ) -> FacilitatorResult<SettlementOutcome> {
        (**self).verify_and_settle(proof, requirements).await
    }
}
