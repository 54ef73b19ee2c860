//! Payment proofs and settlement receipts.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CodecError, CodecResult};
use crate::network::NetworkId;

/// The opaque value a client sends in `X-PAYMENT`.
///
/// Tollgate never interprets it; the facilitator does. The raw value must
/// not be written to logs. Use [`PaymentProof::proof_id`] instead.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PaymentProof(String);

impl PaymentProof {
    /// Wrap a header value. Rejects empty values and characters that cannot
    /// appear in an HTTP header.
    pub fn new(value: impl Into<String>) -> CodecResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(CodecError::MissingField("X-PAYMENT".into()));
        }
        if !trimmed.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(CodecError::invalid(
                "X-PAYMENT",
                "contains characters not allowed in a header",
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The exact header value, for forwarding.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A stable identifier safe to log: hex SHA-256 of the proof.
    pub fn proof_id(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }
}

impl std::fmt::Debug for PaymentProof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PaymentProof").field(&self.proof_id()).finish()
    }
}

/// Facilitator's record of a completed settlement.
///
/// Its presence on a response, as the `X-PAYMENT-RESPONSE` header, is the
/// marker that payment was verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReceipt {
    /// Whether the settlement succeeded.
    pub success: bool,

    /// Transaction hash or facilitator reference.
    #[serde(default)]
    pub transaction: String,

    /// Network the settlement happened on.
    pub network: NetworkId,

    /// Payer address, if the facilitator reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

impl SettlementReceipt {
    /// Encode as an `X-PAYMENT-RESPONSE` header value (base64 JSON).
    pub fn to_header(&self) -> CodecResult<String> {
        Ok(STANDARD.encode(serde_json::to_vec(self)?))
    }

    /// Decode an `X-PAYMENT-RESPONSE` header value.
    pub fn from_header(header: &str) -> CodecResult<Self> {
        let bytes = STANDARD.decode(header.trim())?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
