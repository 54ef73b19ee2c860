//! Mock wallet and the mock proof format.
//!
//! A mock proof is base64 JSON:
//!
//! ```json
//! { "x402Version": 1, "scheme": "exact", "network": "eip155:8453",
//!   "authorization": { "resource": "...", "value": "100000", "payTo": "0x..",
//!                      "asset": "0x..", "validBefore": 1700000000, "nonce": "ab.." },
//!   "signature": "<hex sha256 of the authorization JSON>" }
//! ```
//!
//! [`MockFacilitator`](crate::MockFacilitator) checks the digest and the
//! binding of the authorization to the presented requirements.

use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use tollgate_negotiator::{Signer, SignerError, SignerResult};
use tollgate_types::{NetworkId, NetworkTagFormat, PaymentProof, PaymentRequirements};

/// The signed part of a mock proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockAuthorization {
    /// Resource URL the payment is for
    pub resource: String,
    /// Amount in smallest units
    pub value: String,
    /// Recipient
    pub pay_to: String,
    /// Token contract
    pub asset: String,
    /// Unix seconds after which the authorization is void
    pub valid_before: u64,
    /// Random hex nonce
    pub nonce: String,
}

impl MockAuthorization {
    /// Hex SHA-256 of the canonical JSON of this authorization.
    pub fn digest(&self) -> String {
        let json = serde_json::to_vec(self).expect("authorization serializes");
        hex::encode(Sha256::digest(json))
    }
}

/// A decoded mock proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockPayload {
    /// Protocol version
    pub x402_version: u32,
    /// Scheme tag
    pub scheme: String,
    /// Network tag, in the signer's format
    pub network: String,
    /// Signed authorization
    pub authorization: MockAuthorization,
    /// Digest of `authorization`
    pub signature: String,
}

impl MockPayload {
    /// Sign an authorization for `requirements`.
    pub fn sign(requirements: &PaymentRequirements, network_tag: &str, valid_for_secs: i64) -> Self {
        let valid_before = (unix_now() as i64 + valid_for_secs).max(0) as u64;
        let authorization = MockAuthorization {
            resource: requirements.resource.clone(),
            value: requirements.max_amount_required.as_str().to_string(),
            pay_to: requirements.pay_to.clone(),
            asset: requirements.asset.clone(),
            valid_before,
            nonce: hex::encode(rand::random::<[u8; 16]>()),
        };
        Self {
            x402_version: 1,
            scheme: requirements.scheme.as_str().to_string(),
            network: network_tag.to_string(),
            signature: authorization.digest(),
            authorization,
        }
    }

    /// Encode as an `X-PAYMENT` value.
    pub fn encode(&self) -> PaymentProof {
        let json = serde_json::to_vec(self).expect("payload serializes");
        PaymentProof::new(STANDARD.encode(json)).expect("base64 is a valid header")
    }

    /// Decode an `X-PAYMENT` value, if it is a mock proof.
    pub fn decode(proof: &PaymentProof) -> Option<Self> {
        let bytes = STANDARD.decode(proof.as_str()).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Whether the signature matches the authorization.
    pub fn signature_valid(&self) -> bool {
        self.signature == self.authorization.digest()
    }

    /// The network in canonical form, accepting either tag format.
    pub fn network_id(&self) -> Option<NetworkId> {
        NetworkId::parse(&self.network)
            .or_else(|_| NetworkId::from_tag(&self.network, NetworkTagFormat::LegacyName))
            .ok()
    }
}

/// A correctly signed mock proof for `requirements`, valid for an hour.
pub fn sign_proof(requirements: &PaymentRequirements) -> PaymentProof {
    MockPayload::sign(requirements, requirements.network.as_str(), 3600).encode()
}

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

struct MockSignerInner {
    /// Current network tag, in `format`
    network: String,
    /// Tag format the wallet speaks
    format: NetworkTagFormat,
    /// Reject network switches
    reject_switch: bool,
    /// Reject signature requests
    reject_sign: bool,
    /// Report the wallet as unavailable
    unavailable: Option<String>,
    /// Delay before every answer
    delay: Duration,
    /// Validity window of built proofs
    valid_for_secs: i64,
    /// Produce proofs whose signature does not verify
    corrupt_signature: bool,
    /// Sign for this resource instead of the requested one
    resource_override: Option<String>,
    /// Requirements of every proof built
    built: Vec<PaymentRequirements>,
    /// Network tags passed to `build_proof`
    proof_networks: Vec<String>,
    /// Tags passed to `switch_network`
    switches: Vec<String>,
}

/// A mock wallet implementing [`Signer`].
///
/// Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct MockSigner {
    inner: Arc<RwLock<MockSignerInner>>,
}

impl MockSigner {
    /// A CAIP-2 wallet on `network`.
    pub fn new(network: NetworkId) -> Self {
        Self::with_format(network.as_str().to_string(), NetworkTagFormat::Caip2)
    }

    /// A wallet that speaks legacy names, currently on `network_name`.
    pub fn legacy(network_name: &str) -> Self {
        Self::with_format(network_name.to_string(), NetworkTagFormat::LegacyName)
    }

    fn with_format(network: String, format: NetworkTagFormat) -> Self {
        Self {
            inner: Arc::new(RwLock::new(MockSignerInner {
                network,
                format,
                reject_switch: false,
                reject_sign: false,
                unavailable: None,
                delay: Duration::ZERO,
                valid_for_secs: 3600,
                corrupt_signature: false,
                resource_override: None,
                built: Vec::new(),
                proof_networks: Vec::new(),
                switches: Vec::new(),
            })),
        }
    }

    /// Reject network switch requests.
    pub fn with_switch_rejected(self) -> Self {
        self.inner.write().unwrap().reject_switch = true;
        self
    }

    /// Reject signature requests.
    pub fn with_sign_rejected(self) -> Self {
        self.inner.write().unwrap().reject_sign = true;
        self
    }

    /// Report the wallet as unavailable.
    pub fn with_unavailable(self, reason: &str) -> Self {
        self.inner.write().unwrap().unavailable = Some(reason.to_string());
        self
    }

    /// Wait before every answer, as a user would.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.inner.write().unwrap().delay = delay;
        self
    }

    /// Build proofs that have already expired.
    pub fn with_expired_proofs(self) -> Self {
        self.inner.write().unwrap().valid_for_secs = -60;
        self
    }

    /// Build proofs with a signature that does not verify.
    pub fn with_bad_signature(self) -> Self {
        self.inner.write().unwrap().corrupt_signature = true;
        self
    }

    /// Sign for `resource` regardless of what was requested.
    pub fn with_resource_override(self, resource: &str) -> Self {
        self.inner.write().unwrap().resource_override = Some(resource.to_string());
        self
    }

    // =========================================================================
    // Assertion Helpers
    // =========================================================================

    /// Number of proofs built.
    pub fn proofs_built(&self) -> usize {
        self.inner.read().unwrap().built.len()
    }

    /// Requirements passed to every `build_proof` call.
    pub fn built_requirements(&self) -> Vec<PaymentRequirements> {
        self.inner.read().unwrap().built.clone()
    }

    /// Network tags passed to every `build_proof` call.
    pub fn proof_networks(&self) -> Vec<String> {
        self.inner.read().unwrap().proof_networks.clone()
    }

    /// Tags passed to every `switch_network` call.
    pub fn switch_requests(&self) -> Vec<String> {
        self.inner.read().unwrap().switches.clone()
    }

    /// The wallet's current network tag.
    pub fn network_tag(&self) -> String {
        self.inner.read().unwrap().network.clone()
    }

    async fn pause(&self) -> SignerResult<()> {
        let (delay, unavailable) = {
            let inner = self.inner.read().unwrap();
            (inner.delay, inner.unavailable.clone())
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match unavailable {
            Some(reason) => Err(SignerError::Unavailable(reason)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Signer for MockSigner {
    fn tag_format(&self) -> NetworkTagFormat {
        self.inner.read().unwrap().format
    }

    async fn current_network(&self) -> SignerResult<String> {
        if let Some(reason) = self.inner.read().unwrap().unavailable.clone() {
            return Err(SignerError::Unavailable(reason));
        }
        Ok(self.network_tag())
    }

    async fn switch_network(&self, network: &str) -> SignerResult<()> {
        self.pause().await?;
        let mut inner = self.inner.write().unwrap();
        inner.switches.push(network.to_string());
        if inner.reject_switch {
            return Err(SignerError::NetworkSwitchRejected);
        }
        inner.network = network.to_string();
        Ok(())
    }

    async fn build_proof(
        &self,
        requirements: &PaymentRequirements,
        network: &str,
    ) -> SignerResult<PaymentProof> {
        self.pause().await?;
        let mut inner = self.inner.write().unwrap();
        if inner.reject_sign {
            return Err(SignerError::Rejected);
        }
        inner.built.push(requirements.clone());
        inner.proof_networks.push(network.to_string());

        let mut payload = MockPayload::sign(requirements, network, inner.valid_for_secs);
        if let Some(resource) = &inner.resource_override {
            payload.authorization.resource = resource.clone();
            payload.signature = payload.authorization.digest();
        }
        if inner.corrupt_signature {
            payload.signature = "00".repeat(32);
        }
        Ok(payload.encode())
    }
}
