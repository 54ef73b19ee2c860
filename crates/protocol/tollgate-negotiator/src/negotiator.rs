//! The payment negotiator.
//!
//! Drives `request → 402 → build proof → retry` for one resource at a time:
//!
//! ```text
//! Idle → Requesting ─┬─ 2xx ─────────────────────────────────────→ Granted
//!                    ├─ 402 → ChallengeReceived → BuildingProof → Retrying ─┬─ 2xx → Granted
//!                    │              ↑                                       │
//!                    │              └──────── 402 (within retry limit) ─────┘
//!                    └─ other ──────────────────────────────────────→ Failed
//! ```

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use tollgate_types::{
    ErrorCode, NetworkId, PaymentChallenge, PaymentProof, PaymentRequirements, SettlementReceipt,
};

use crate::cancel::CancellationSignal;
use crate::error::{NegotiationError, NegotiationResult, SignerError};
use crate::signer::Signer;
use crate::state::NegotiationState;
use crate::transport::{ResourceRequest, Transport, TransportResponse};

/// Default automatic re-submissions after a rejected proof.
pub const DEFAULT_RETRY_LIMIT: u32 = 1;

/// Default upper bound on any single signer step, in seconds.
pub const DEFAULT_SIGNER_TIMEOUT_CAP_SECS: u64 = 300;

/// Negotiator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiatorConfig {
    /// Proofs presented after the first one is rejected
    pub retry_limit: u32,
    /// Cap on the challenge's `maxTimeoutSeconds` for signer steps
    pub signer_timeout_cap_secs: u64,
}

impl Default for NegotiatorConfig {
    fn default() -> Self {
        Self {
            retry_limit: DEFAULT_RETRY_LIMIT,
            signer_timeout_cap_secs: DEFAULT_SIGNER_TIMEOUT_CAP_SECS,
        }
    }
}

/// A resource obtained by a negotiation.
#[derive(Debug, Clone)]
pub struct GrantedResource {
    /// Response body
    pub body: Bytes,
    /// `Content-Type` of the response
    pub content_type: Option<String>,
    /// Settlement receipt, absent for free resources
    pub receipt: Option<SettlementReceipt>,
    /// Proofs presented
    pub attempts: u32,
}

/// Client-side x402 negotiator.
pub struct Negotiator<T, S> {
    transport: T,
    signer: S,
    config: NegotiatorConfig,
    state: watch::Sender<NegotiationState>,
}

impl<T: Transport, S: Signer> Negotiator<T, S> {
    /// Create a negotiator with the default configuration.
    pub fn new(transport: T, signer: S) -> Self {
        Self::with_config(transport, signer, NegotiatorConfig::default())
    }

    /// Create a negotiator.
    pub fn with_config(transport: T, signer: S, config: NegotiatorConfig) -> Self {
        let (state, _) = watch::channel(NegotiationState::Idle);
        Self {
            transport,
            signer,
            config,
            state,
        }
    }

    /// The configuration.
    pub fn config(&self) -> &NegotiatorConfig {
        &self.config
    }

    /// The current state.
    pub fn state(&self) -> NegotiationState {
        self.state.borrow().clone()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<NegotiationState> {
        self.state.subscribe()
    }

    /// Return to `Idle`, discarding any held requirements.
    pub fn reset(&self) {
        self.transition(NegotiationState::Idle);
    }

    fn transition(&self, next: NegotiationState) {
        debug!(state = %next, "Negotiation state");
        self.state.send_replace(next);
    }

    fn fail(&self, error: NegotiationError) -> NegotiationError {
        if error == NegotiationError::Cancelled {
            self.transition(NegotiationState::Idle);
        } else {
            warn!(
                category = %error.category(),
                error = %error,
                "Negotiation failed"
            );
            self.transition(NegotiationState::Failed {
                category: error.category(),
            });
        }
        error
    }

    /// Fetch `url`, paying if challenged.
    pub async fn fetch(
        &self,
        url: &str,
        cancel: &CancellationSignal,
    ) -> NegotiationResult<GrantedResource> {
        self.run(url, cancel).await.map_err(|e| self.fail(e))
    }

    async fn run(
        &self,
        url: &str,
        cancel: &CancellationSignal,
    ) -> NegotiationResult<GrantedResource> {
        if cancel.is_cancelled() {
            return Err(NegotiationError::Cancelled);
        }

        self.transition(NegotiationState::Requesting);
        let mut response = self.transport.send(ResourceRequest::new(url)).await?;
        let mut attempts: u32 = 0;

        loop {
            if response.status.is_success() {
                return Ok(self.grant(response, attempts));
            }
            if response.status.as_u16() != 402 {
                return Err(NegotiationError::UnexpectedStatus {
                    status: response.status.as_u16(),
                });
            }

            let challenge = parse_challenge(&response)?;
            if attempts > 0 {
                // A bare challenge after a proof means the proof was ignored.
                let code = challenge.error_code().unwrap_or(ErrorCode::PaymentRequired);
                if attempts > self.config.retry_limit || !code.category().allows_new_proof() {
                    return Err(NegotiationError::Verification { code, attempts });
                }
                warn!(attempt = attempts, code = %code, "Payment rejected, retrying with refreshed requirements");
            }

            let requirements = challenge
                .active_requirements()
                .cloned()
                .ok_or_else(|| NegotiationError::MalformedChallenge("no requirements".into()))?;
            debug!(
                resource = %requirements.resource,
                network = %requirements.network,
                amount = %requirements.max_amount_required,
                "Payment challenge received"
            );
            self.transition(NegotiationState::ChallengeReceived {
                requirements: Box::new(requirements.clone()),
            });

            let proof = self.build_proof(&requirements, cancel).await?;
            if cancel.is_cancelled() {
                return Err(NegotiationError::Cancelled);
            }

            attempts += 1;
            self.transition(NegotiationState::Retrying { attempt: attempts });
            response = self
                .transport
                .send(ResourceRequest::new(url).with_payment(proof))
                .await?;
        }
    }

    fn grant(&self, response: TransportResponse, attempts: u32) -> GrantedResource {
        let receipt = response.receipt();
        if let Some(receipt) = &receipt {
            info!(
                transaction = %receipt.transaction,
                network = %receipt.network,
                attempts,
                "Payment accepted"
            );
        }
        self.transition(NegotiationState::Granted);
        GrantedResource {
            content_type: response.content_type(),
            body: response.body,
            receipt,
            attempts,
        }
    }

    async fn build_proof(
        &self,
        requirements: &PaymentRequirements,
        cancel: &CancellationSignal,
    ) -> NegotiationResult<PaymentProof> {
        self.transition(NegotiationState::BuildingProof {
            requirements: Box::new(requirements.clone()),
        });

        let format = self.signer.tag_format();
        let network = &requirements.network;
        let wanted = network
            .to_tag(format)
            .ok_or_else(|| NegotiationError::UnsupportedNetwork {
                network: network.clone(),
            })?;

        let current = self
            .signer_step(requirements, cancel, self.signer.current_network())
            .await?;
        if NetworkId::from_tag(&current, format).ok().as_ref() != Some(network) {
            info!(from = %current, to = %wanted, "Switching signer network");
            self.signer_step(requirements, cancel, self.signer.switch_network(&wanted))
                .await?;

            let now = self
                .signer_step(requirements, cancel, self.signer.current_network())
                .await?;
            if NetworkId::from_tag(&now, format).ok().as_ref() != Some(network) {
                return Err(NegotiationError::NetworkSwitchRejected {
                    network: network.clone(),
                });
            }
        }

        let proof = self
            .signer_step(
                requirements,
                cancel,
                self.signer.build_proof(requirements, &wanted),
            )
            .await?;
        debug!(proof_id = %proof.proof_id(), "Payment proof built");
        Ok(proof)
    }

    /// Await one user-mediated signer step, bounded by the challenge's
    /// timeout and abandoned on cancellation.
    async fn signer_step<R>(
        &self,
        requirements: &PaymentRequirements,
        cancel: &CancellationSignal,
        step: impl Future<Output = Result<R, SignerError>>,
    ) -> NegotiationResult<R> {
        let seconds = requirements
            .max_timeout_seconds
            .min(self.config.signer_timeout_cap_secs)
            .max(1);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(NegotiationError::Cancelled),
            result = tokio::time::timeout(Duration::from_secs(seconds), step) => match result {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(NegotiationError::from_signer(e, &requirements.network)),
                Err(_) => Err(NegotiationError::SignerTimeout { seconds }),
            },
        }
    }
}

impl<T, S> std::fmt::Debug for Negotiator<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Negotiator")
            .field("config", &self.config)
            .field("state", &*self.state.borrow())
            .finish()
    }
}

fn parse_challenge(response: &TransportResponse) -> NegotiationResult<PaymentChallenge> {
    let body = std::str::from_utf8(&response.body)
        .map_err(|e| NegotiationError::MalformedChallenge(e.to_string()))?;
    PaymentChallenge::from_json(body).map_err(|e| NegotiationError::MalformedChallenge(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use http::StatusCode;
    use std::sync::Mutex;
    use tollgate_types::{ErrorCategory, NetworkTagFormat, Scheme, TokenAmount};

    use crate::error::{SignerResult, TransportError};

    fn requirements() -> PaymentRequirements {
        PaymentRequirements {
            scheme: Scheme::Exact,
            network: NetworkId::base(),
            max_amount_required: TokenAmount::parse("100000").unwrap(),
            resource: "https://example.com/video".into(),
            description: String::new(),
            mime_type: "video/mp4".into(),
            pay_to: "0xmerchant".into(),
            max_timeout_seconds: 60,
            asset: "0xasset".into(),
            extra: None,
        }
    }

    fn challenge(error: Option<ErrorCode>) -> TransportResponse {
        let body = PaymentChallenge::new(requirements(), error).to_json().unwrap();
        TransportResponse::new(StatusCode::PAYMENT_REQUIRED, body)
    }

    /// Replays responses in order and records requests.
    struct Replay {
        responses: Mutex<Vec<TransportResponse>>,
        requests: Mutex<Vec<ResourceRequest>>,
    }

    impl Replay {
        fn new(mut responses: Vec<TransportResponse>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for Replay {
        async fn send(
            &self,
            request: ResourceRequest,
        ) -> Result<TransportResponse, TransportError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| TransportError::Network("script exhausted".into()))
        }
    }

    /// Signs anything, on a fixed network, in a fixed tag format.
    struct Wallet {
        network: Mutex<String>,
        format: NetworkTagFormat,
        proof_networks: Mutex<Vec<String>>,
    }

    impl Wallet {
        fn new(network: &str, format: NetworkTagFormat) -> Self {
            Self {
                network: Mutex::new(network.to_string()),
                format,
                proof_networks: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Signer for Wallet {
        fn tag_format(&self) -> NetworkTagFormat {
            self.format
        }

        async fn current_network(&self) -> SignerResult<String> {
            Ok(self.network.lock().unwrap().clone())
        }

        async fn switch_network(&self, network: &str) -> SignerResult<()> {
            *self.network.lock().unwrap() = network.to_string();
            Ok(())
        }

        async fn build_proof(
            &self,
            _requirements: &PaymentRequirements,
            network: &str,
        ) -> SignerResult<PaymentProof> {
            self.proof_networks.lock().unwrap().push(network.to_string());
            Ok(PaymentProof::new("c2lnbmVk").unwrap())
        }
    }

    #[tokio::test]
    async fn test_free_resource_is_granted_without_payment() {
        let negotiator = Negotiator::new(
            Replay::new(vec![TransportResponse::new(StatusCode::OK, "free")]),
            Wallet::new("eip155:8453", NetworkTagFormat::Caip2),
        );
        let granted = negotiator
            .fetch("https://example.com/free", &CancellationSignal::new())
            .await
            .unwrap();
        assert_eq!(granted.attempts, 0);
        assert!(granted.receipt.is_none());
        assert_eq!(negotiator.state(), NegotiationState::Granted);
    }

    #[tokio::test]
    async fn test_unexpected_status_is_terminal() {
        let negotiator = Negotiator::new(
            Replay::new(vec![TransportResponse::new(StatusCode::NOT_FOUND, "")]),
            Wallet::new("eip155:8453", NetworkTagFormat::Caip2),
        );
        let err = negotiator
            .fetch("https://example.com/video", &CancellationSignal::new())
            .await
            .unwrap_err();
        assert_eq!(err, NegotiationError::UnexpectedStatus { status: 404 });
        assert_eq!(
            negotiator.state(),
            NegotiationState::Failed {
                category: ErrorCategory::UnexpectedStatus
            }
        );
    }

    #[tokio::test]
    async fn test_legacy_signer_gets_adapted_tag_and_switches() {
        let negotiator = Negotiator::new(
            Replay::new(vec![
                challenge(None),
                TransportResponse::new(StatusCode::OK, "video"),
            ]),
            Wallet::new("base-sepolia", NetworkTagFormat::LegacyName),
        );
        negotiator
            .fetch("https://example.com/video", &CancellationSignal::new())
            .await
            .unwrap();

        assert_eq!(*negotiator.signer.network.lock().unwrap(), "base");
        assert_eq!(*negotiator.signer.proof_networks.lock().unwrap(), vec!["base"]);
    }

    #[tokio::test]
    async fn test_malformed_challenge() {
        let negotiator = Negotiator::new(
            Replay::new(vec![TransportResponse::new(
                StatusCode::PAYMENT_REQUIRED,
                "{\"x402Version\":1}",
            )]),
            Wallet::new("eip155:8453", NetworkTagFormat::Caip2),
        );
        let err = negotiator
            .fetch("https://example.com/video", &CancellationSignal::new())
            .await
            .unwrap_err();
        assert!(matches!(err, NegotiationError::MalformedChallenge(_)));
    }

    #[tokio::test]
    async fn test_unsupported_network_for_legacy_signer() {
        let mut req = requirements();
        req.network = NetworkId::eip155(999_999);
        let body = PaymentChallenge::new(req, None).to_json().unwrap();
        let negotiator = Negotiator::new(
            Replay::new(vec![TransportResponse::new(StatusCode::PAYMENT_REQUIRED, body)]),
            Wallet::new("base", NetworkTagFormat::LegacyName),
        );
        let err = negotiator
            .fetch("https://example.com/video", &CancellationSignal::new())
            .await
            .unwrap_err();
        assert!(matches!(err, NegotiationError::UnsupportedNetwork { .. }));
    }

    #[tokio::test]
    async fn test_non_retryable_code_stops_immediately() {
        let negotiator = Negotiator::with_config(
            Replay::new(vec![
                challenge(None),
                challenge(Some(ErrorCode::ConfigurationError)),
            ]),
            Wallet::new("eip155:8453", NetworkTagFormat::Caip2),
            NegotiatorConfig {
                retry_limit: 5,
                ..Default::default()
            },
        );
        let err = negotiator
            .fetch("https://example.com/video", &CancellationSignal::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            NegotiationError::Verification {
                code: ErrorCode::ConfigurationError,
                attempts: 1
            }
        );
    }

    #[tokio::test]
    async fn test_unavailable_verification_is_not_repaid() {
        let negotiator = Negotiator::new(
            Replay::new(vec![
                challenge(None),
                challenge(Some(ErrorCode::VerificationUnavailable)),
                TransportResponse::new(StatusCode::OK, "video"),
            ]),
            Wallet::new("eip155:8453", NetworkTagFormat::Caip2),
        );
        let err = negotiator
            .fetch("https://example.com/video", &CancellationSignal::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            NegotiationError::Verification {
                code: ErrorCode::VerificationUnavailable,
                attempts: 1
            }
        );
        assert_eq!(err.category(), ErrorCategory::TransientInfra);
        assert_eq!(negotiator.signer.proof_networks.lock().unwrap().len(), 1);
        assert_eq!(negotiator.transport.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_already_cancelled_never_sends() {
        let negotiator = Negotiator::new(
            Replay::new(vec![]),
            Wallet::new("eip155:8453", NetworkTagFormat::Caip2),
        );
        let cancel = CancellationSignal::new();
        cancel.cancel();
        let err = negotiator
            .fetch("https://example.com/video", &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, NegotiationError::Cancelled);
        assert!(negotiator.transport.requests.lock().unwrap().is_empty());
        assert_eq!(negotiator.state(), NegotiationState::Idle);
    }
}
