//! A signer backed by a proof built elsewhere.

use async_trait::async_trait;

use tollgate_negotiator::{Signer, SignerError, SignerResult};
use tollgate_types::{NetworkId, PaymentProof, PaymentRequirements};

/// Hands out one pre-built proof for the network it was signed on.
///
/// It cannot switch networks, so a challenge on any other network ends the
/// negotiation before the proof is sent.
#[derive(Debug, Clone)]
pub struct PresignedSigner {
    proof: PaymentProof,
    network: NetworkId,
}

impl PresignedSigner {
    /// Wrap `proof`, signed for `network`.
    pub fn new(proof: PaymentProof, network: NetworkId) -> Self {
        Self { proof, network }
    }
}

#[async_trait]
impl Signer for PresignedSigner {
    async fn current_network(&self) -> SignerResult<String> {
        Ok(self.network.as_str().to_string())
    }

    async fn switch_network(&self, _network: &str) -> SignerResult<()> {
        Err(SignerError::NetworkSwitchRejected)
    }

    async fn build_proof(
        &self,
        _requirements: &PaymentRequirements,
        _network: &str,
    ) -> SignerResult<PaymentProof> {
        Ok(self.proof.clone())
    }
}
