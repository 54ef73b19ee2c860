//! HTTP facilitator client.
//!
//! Talks to any x402 v1 facilitator exposing `POST /verify`, `POST /settle`
//! and `GET /supported`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use tollgate_types::{
    ErrorCode, NetworkId, NetworkTagFormat, PaymentProof, PaymentRequirements, SettlementReceipt,
};

use crate::config::FacilitatorConfig;
use crate::error::{FacilitatorError, FacilitatorResult};
use crate::retry::RetryPolicy;
use crate::traits::{Facilitator, SettlementOutcome};
use crate::types::{FacilitatorRequest, SettleResponse, SupportedResponse, VerifyResponse};

/// Client for a remote x402 facilitator.
#[derive(Clone)]
pub struct HttpFacilitator {
    /// HTTP client
    client: Client,
    /// Base URL of the facilitator, without trailing slash
    base_url: String,
    /// Bearer credential
    api_key: Option<String>,
    /// Transport retry policy
    retry: RetryPolicy,
    /// Outbound network tag spelling
    network_format: NetworkTagFormat,
}

impl HttpFacilitator {
    /// Create a client from configuration.
    pub fn new(config: &FacilitatorConfig) -> FacilitatorResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| FacilitatorError::config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            retry: RetryPolicy::from_config(&config.retry),
            network_format: config.network_format,
        })
    }

    /// Get the facilitator's base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Verify a proof, once, without settling.
    pub async fn verify(
        &self,
        proof: &PaymentProof,
        requirements: &PaymentRequirements,
    ) -> FacilitatorResult<VerifyResponse> {
        let url = format!("{}/verify", self.base_url);
        debug!(url = %url, proof_id = %proof.proof_id(), "Verifying payment with facilitator");

        let body = FacilitatorRequest::new(proof, requirements, self.network_format)?;
        let response = self
            .authorize(self.client.post(&url))
            .json(&body)
            .send()
            .await?;

        // Some facilitators answer an invalid proof with 400 and a normal body.
        let status = response.status();
        let text = response.text().await?;
        if status.is_success() || status == StatusCode::BAD_REQUEST {
            if let Ok(verdict) = serde_json::from_str::<VerifyResponse>(&text) {
                return Ok(verdict);
            }
        }
        Err(Self::status_error(status, text))
    }

    /// Settle a verified proof, once.
    pub async fn settle(
        &self,
        proof: &PaymentProof,
        requirements: &PaymentRequirements,
    ) -> FacilitatorResult<SettleResponse> {
        let url = format!("{}/settle", self.base_url);
        debug!(url = %url, proof_id = %proof.proof_id(), "Settling payment with facilitator");

        let body = FacilitatorRequest::new(proof, requirements, self.network_format)?;
        let response = self
            .authorize(self.client.post(&url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if status.is_success() || status == StatusCode::BAD_REQUEST {
            if let Ok(result) = serde_json::from_str::<SettleResponse>(&text) {
                return Ok(result);
            }
        }
        Err(Self::status_error(status, text))
    }

    /// Query which `(scheme, network)` pairs the facilitator supports.
    pub async fn supported(&self) -> FacilitatorResult<SupportedResponse> {
        let supported = self.retry.execute(|| self.supported_once()).await?;
        debug!(kinds = supported.kinds.len(), "Facilitator supported kinds");
        Ok(supported)
    }

    async fn supported_once(&self) -> FacilitatorResult<SupportedResponse> {
        let url = format!("{}/supported", self.base_url);
        debug!(url = %url, "Querying facilitator supported networks");

        let response = self.authorize(self.client.get(&url)).send().await?;
        Self::parse(response).await
    }

    /// Check if the facilitator supports a network.
    pub async fn supports_network(&self, network: &NetworkId) -> FacilitatorResult<bool> {
        Ok(self.supported().await?.supports(network))
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> FacilitatorResult<T> {
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(Self::status_error(status, text));
        }
        serde_json::from_str(&text).map_err(|e| FacilitatorError::decode(e.to_string()))
    }

    fn status_error(status: StatusCode, body: String) -> FacilitatorError {
        if status.is_success() {
            FacilitatorError::decode(format!("unexpected body: {}", body))
        } else {
            FacilitatorError::http(status.as_u16(), body)
        }
    }
}

#[async_trait]
impl Facilitator for HttpFacilitator {
    async fn verify_and_settle(
        &self,
        proof: &PaymentProof,
        requirements: &PaymentRequirements,
    ) -> FacilitatorResult<SettlementOutcome> {
        let proof_id = proof.proof_id();

        // Verification has no side effects and may be repeated freely.
        let verdict = self
            .retry
            .execute(|| self.verify(proof, requirements))
            .await?;

        if !verdict.is_valid {
            let reason = verdict.invalid_reason.unwrap_or_default();
            let code = ErrorCode::from_reason(&reason);
            warn!(proof_id = %proof_id, reason = %reason, code = %code, "Payment verification failed");
            return Ok(SettlementOutcome::rejected(code));
        }
        debug!(proof_id = %proof_id, payer = ?verdict.payer, "Payment verified");

        // Settlement moves funds. Re-send only if the previous attempt never
        // left this process.
        let settlement = self
            .retry
            .execute_if(FacilitatorError::is_unsent, || self.settle(proof, requirements))
            .await
            .map_err(|e| {
                error!(
                    proof_id = %proof_id,
                    error = %e,
                    "Settlement outcome unknown; reconcile with the facilitator"
                );
                e
            })?;

        if !settlement.success {
            let reason = settlement.error_reason.clone().unwrap_or_default();
            let code = ErrorCode::from_reason(&reason);
            warn!(proof_id = %proof_id, reason = %reason, code = %code, "Payment settlement failed");
            return Ok(SettlementOutcome::rejected(code));
        }

        let receipt = SettlementReceipt {
            success: true,
            network: settlement.network_id(&requirements.network),
            transaction: settlement.transaction,
            payer: settlement.payer.or(verdict.payer),
        };
        info!(
            proof_id = %proof_id,
            transaction = %receipt.transaction,
            network = %receipt.network,
            "Payment settled"
        );
        Ok(SettlementOutcome::settled(receipt))
    }
}

impl std::fmt::Debug for HttpFacilitator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFacilitator")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.api_key.is_some())
            .field("network_format", &self.network_format)
            .finish()
    }
}
