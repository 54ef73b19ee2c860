//! Mock facilitator for testing.
//!
//! Verifies [`MockPayload`] proofs against the presented requirements and
//! keeps a consumed-proof set so a second settlement of the same proof is
//! rejected with `already_settled`.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use tollgate_facilitator::{Facilitator, FacilitatorError, FacilitatorResult, SettlementOutcome};
use tollgate_types::{ErrorCode, PaymentProof, PaymentRequirements, SettlementReceipt};

use crate::mock_signer::{unix_now, MockPayload};

/// Address reported as the payer of every mock settlement.
pub const MOCK_PAYER: &str = "0x857b06519E91e3A54538791bDbb0E22373e36b66";

/// One settlement performed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementRecord {
    /// Id of the settled proof
    pub proof_id: String,
    /// Resource the payment was for
    pub resource: String,
    /// Amount in smallest units
    pub amount: String,
    /// Recipient
    pub pay_to: String,
    /// Transaction hash
    pub transaction: String,
}

struct MockFacilitatorInner {
    /// Ids of settled proofs
    consumed_proofs: HashSet<String>,
    /// Nonces of settled authorizations
    consumed_nonces: HashSet<String>,
    /// Settlements in order
    settlements: Vec<SettlementRecord>,
    /// Total `verify_and_settle` calls
    calls: u32,
    /// Fail every call with a transport error
    should_fail: bool,
    /// Reject every proof with this code
    reject_with: Option<ErrorCode>,
    /// Delay before every answer
    delay: Duration,
}

/// Mock facilitator implementing [`Facilitator`].
///
/// Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct MockFacilitator {
    inner: Arc<RwLock<MockFacilitatorInner>>,
}

impl Default for MockFacilitator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFacilitator {
    /// Create a mock facilitator that judges proofs honestly.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MockFacilitatorInner {
                consumed_proofs: HashSet::new(),
                consumed_nonces: HashSet::new(),
                settlements: Vec::new(),
                calls: 0,
                should_fail: false,
                reject_with: None,
                delay: Duration::ZERO,
            })),
        }
    }

    /// Create a mock facilitator that is unreachable.
    pub fn with_failure() -> Self {
        let mock = Self::new();
        mock.set_should_fail(true);
        mock
    }

    /// Reject every proof with `code` (builder style).
    pub fn rejecting(self, code: ErrorCode) -> Self {
        self.inner.write().unwrap().reject_with = Some(code);
        self
    }

    /// Wait before every answer (builder style).
    pub fn with_delay(self, delay: Duration) -> Self {
        self.inner.write().unwrap().delay = delay;
        self
    }

    /// Set whether calls fail with a transport error.
    pub fn set_should_fail(&self, should_fail: bool) {
        self.inner.write().unwrap().should_fail = should_fail;
    }

    // =========================================================================
    // Assertion Helpers
    // =========================================================================

    /// Number of `verify_and_settle` calls.
    pub fn call_count(&self) -> u32 {
        self.inner.read().unwrap().calls
    }

    /// Number of settlements.
    pub fn settlement_count(&self) -> usize {
        self.inner.read().unwrap().settlements.len()
    }

    /// All settlements in order.
    pub fn settlements(&self) -> Vec<SettlementRecord> {
        self.inner.read().unwrap().settlements.clone()
    }

    /// Whether a proof has been settled.
    pub fn is_consumed(&self, proof: &PaymentProof) -> bool {
        self.inner
            .read()
            .unwrap()
            .consumed_proofs
            .contains(&proof.proof_id())
    }

    /// Judge a proof without recording anything.
    fn judge(payload: &MockPayload, requirements: &PaymentRequirements) -> Option<ErrorCode> {
        let auth = &payload.authorization;
        if !payload.signature_valid() {
            return Some(ErrorCode::InvalidSignature);
        }
        if payload.scheme != requirements.scheme.as_str() {
            return Some(ErrorCode::InvalidPayload);
        }
        if payload.network_id().as_ref() != Some(&requirements.network) {
            return Some(ErrorCode::NetworkMismatch);
        }
        if !requirements.same_resource(&auth.resource) {
            return Some(ErrorCode::ResourceMismatch);
        }
        if !auth.pay_to.eq_ignore_ascii_case(&requirements.pay_to) {
            return Some(ErrorCode::RecipientMismatch);
        }
        if !auth.asset.eq_ignore_ascii_case(&requirements.asset) {
            return Some(ErrorCode::AssetMismatch);
        }
        let value = auth.value.parse::<u128>().ok();
        if value.is_none() || value != requirements.max_amount_required.as_u128() {
            return Some(ErrorCode::AmountMismatch);
        }
        if auth.valid_before <= unix_now() {
            return Some(ErrorCode::Expired);
        }
        None
    }
}

#[async_trait]
impl Facilitator for MockFacilitator {
    async fn verify_and_settle(
        &self,
        proof: &PaymentProof,
        requirements: &PaymentRequirements,
    ) -> FacilitatorResult<SettlementOutcome> {
        let delay = {
            let mut inner = self.inner.write().unwrap();
            inner.calls += 1;
            if inner.should_fail {
                return Err(FacilitatorError::timeout("mock facilitator unavailable"));
            }
            inner.delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.write().unwrap();
        if let Some(code) = inner.reject_with {
            return Ok(SettlementOutcome::rejected(code));
        }

        let Some(payload) = MockPayload::decode(proof) else {
            return Ok(SettlementOutcome::rejected(ErrorCode::InvalidPayload));
        };
        if let Some(code) = Self::judge(&payload, requirements) {
            return Ok(SettlementOutcome::rejected(code));
        }

        let proof_id = proof.proof_id();
        if inner.consumed_proofs.contains(&proof_id)
            || inner.consumed_nonces.contains(&payload.authorization.nonce)
        {
            return Ok(SettlementOutcome::rejected(ErrorCode::AlreadySettled));
        }
        inner.consumed_proofs.insert(proof_id.clone());
        inner
            .consumed_nonces
            .insert(payload.authorization.nonce.clone());

        let transaction = format!("0x{:064x}", inner.settlements.len() + 1);
        inner.settlements.push(SettlementRecord {
            proof_id,
            resource: payload.authorization.resource.clone(),
            amount: payload.authorization.value.clone(),
            pay_to: payload.authorization.pay_to.clone(),
            transaction: transaction.clone(),
        });

        Ok(SettlementOutcome::settled(SettlementReceipt {
            success: true,
            transaction,
            network: requirements.network.clone(),
            payer: Some(MOCK_PAYER.to_string()),
        }))
    }
}
