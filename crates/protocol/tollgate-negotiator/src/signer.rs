//! The wallet collaborator.

use std::sync::Arc;

use async_trait::async_trait;
use tollgate_types::{NetworkTagFormat, PaymentProof, PaymentRequirements};

use crate::error::SignerResult;

/// A wallet that can switch networks and sign payments.
///
/// Network tags passed to and from a signer are spelled in its own
/// [`tag_format`](Signer::tag_format). Every method may suspend on the user.
#[async_trait]
pub trait Signer: Send + Sync {
    /// How this signer spells networks.
    fn tag_format(&self) -> NetworkTagFormat {
        NetworkTagFormat::Caip2
    }

    /// The network the wallet is currently on.
    async fn current_network(&self) -> SignerResult<String>;

    /// Ask the wallet to switch to `network`.
    async fn switch_network(&self, network: &str) -> SignerResult<()>;

    /// Sign a payment for `requirements`.
    ///
    /// `requirements` is exactly what the server issued. `network` is its
    /// network spelled in this signer's tag format.
    async fn build_proof(
        &self,
        requirements: &PaymentRequirements,
        network: &str,
    ) -> SignerResult<PaymentProof>;
}

#[async_trait]
impl<S: Signer + ?Sized> Signer for Arc<S> {
    fn tag_format(&self) -> NetworkTagFormat {
        (**self).tag_format()
    }

    async fn current_network(&self) -> SignerResult<String> {
        (**self).current_network().await
    }

    async fn switch_network(&self, network: &str) -> SignerResult<()> {
        (**self).switch_network(network).await
    }

    async fn build_proof(
        &self,
        requirements: &PaymentRequirements,
        network: &str,
    ) -> SignerResult<PaymentProof> {
        (**self).build_proof(requirements, network).await
    }
}
