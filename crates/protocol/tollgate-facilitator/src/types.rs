//! Facilitator wire messages (x402 v1 `/verify`, `/settle`, `/supported`).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tollgate_types::{NetworkId, NetworkTagFormat, PaymentProof, PaymentRequirements, X402_VERSION};

use crate::error::{FacilitatorError, FacilitatorResult};

/// Body of `/verify` and `/settle` requests.
///
/// `payment_header` is the `X-PAYMENT` value exactly as the client sent it.
/// `payment_requirements` is a wire copy whose network tag is spelled the
/// way the facilitator expects; the guard's canonical copy is untouched.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilitatorRequest<'a> {
    /// Protocol version
    pub x402_version: u32,
    /// Opaque proof, forwarded byte-for-byte
    pub payment_header: &'a str,
    /// Requirements derived by the resource server, network adapted
    pub payment_requirements: Value,
}

impl<'a> FacilitatorRequest<'a> {
    /// Build a request body, spelling the network in `format`.
    pub fn new(
        proof: &'a PaymentProof,
        requirements: &PaymentRequirements,
        format: NetworkTagFormat,
    ) -> FacilitatorResult<Self> {
        let tag = requirements.network.to_tag(format).ok_or_else(|| {
            FacilitatorError::config(format!(
                "network {} has no {:?} tag",
                requirements.network, format
            ))
        })?;
        let mut payment_requirements = serde_json::to_value(requirements)
            .map_err(|e| FacilitatorError::decode(e.to_string()))?;
        if let Some(fields) = payment_requirements.as_object_mut() {
            fields.insert("network".to_string(), Value::String(tag));
        }

        Ok(Self {
            x402_version: X402_VERSION,
            payment_header: proof.as_str(),
            payment_requirements,
        })
    }
}

/// Response from `/verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    /// Whether the proof is valid for the requirements
    pub is_valid: bool,
    /// Reason for rejection, if invalid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<String>,
    /// Payer address, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

/// Response from `/settle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleResponse {
    /// Whether settlement succeeded
    pub success: bool,
    /// Reason for failure
    #[serde(default, alias = "error", skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    /// Transaction hash
    #[serde(default, alias = "txHash")]
    pub transaction: String,
    /// Network tag as reported by the facilitator
    #[serde(default, alias = "networkId")]
    pub network: String,
    /// Payer address, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

impl SettleResponse {
    /// The settlement network in canonical form.
    ///
    /// Facilitators report either CAIP-2 or legacy names; anything
    /// unrecognised falls back to `expected`.
    pub fn network_id(&self, expected: &NetworkId) -> NetworkId {
        NetworkId::parse(&self.network)
            .or_else(|_| NetworkId::from_tag(&self.network, NetworkTagFormat::LegacyName))
            .unwrap_or_else(|_| expected.clone())
    }
}

/// One supported `(scheme, network)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedKind {
    /// Protocol version
    #[serde(default)]
    pub x402_version: u32,
    /// Scheme tag
    pub scheme: String,
    /// Network tag (CAIP-2 or legacy)
    pub network: String,
}

/// Response from `/supported`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedResponse {
    /// Supported kinds
    #[serde(default)]
    pub kinds: Vec<SupportedKind>,
}

impl SupportedResponse {
    /// Whether any kind names `network`, in either tag format.
    pub fn supports(&self, network: &NetworkId) -> bool {
        let legacy = network.to_tag(NetworkTagFormat::LegacyName);
        self.kinds.iter().any(|k| {
            k.network == network.as_str() || legacy.as_deref() == Some(k.network.as_str())
        })
    }
}
