//! Payment requirements and the 402 challenge body.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::amount::TokenAmount;
use crate::constants::{DEFAULT_MAX_TIMEOUT_SECONDS, X402_VERSION};
use crate::error::{CodecError, CodecResult, ErrorCode};
use crate::network::NetworkId;
use crate::resource::normalize_resource_url;

/// Payment scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scheme {
    /// Pay exactly `maxAmountRequired`.
    Exact,
}

impl Scheme {
    /// Wire tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
        }
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_max_timeout_seconds() -> u64 {
    DEFAULT_MAX_TIMEOUT_SECONDS
}

/// Terms a client must satisfy to access a resource.
///
/// Issued by the server per challenge and never trusted back from a client:
/// the server always re-derives it from the live request and its own config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    /// Payment scheme.
    pub scheme: Scheme,

    /// Canonical CAIP-2 network.
    pub network: NetworkId,

    /// Amount in the asset's smallest unit.
    pub max_amount_required: TokenAmount,

    /// Canonical URL of the protected resource.
    pub resource: String,

    /// Informational.
    #[serde(default)]
    pub description: String,

    /// MIME type of the resource body. Informational.
    #[serde(default)]
    pub mime_type: String,

    /// Recipient address.
    pub pay_to: String,

    /// How long the client may take to present a proof.
    #[serde(default = "default_max_timeout_seconds")]
    pub max_timeout_seconds: u64,

    /// Token contract address.
    pub asset: String,

    /// Scheme-specific data for the proof builder (e.g. signing domain).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Map<String, Value>>,
}

impl PaymentRequirements {
    /// Wire names of the fields that must always be present.
    pub const REQUIRED_FIELDS: [&'static str; 6] = [
        "scheme",
        "network",
        "maxAmountRequired",
        "resource",
        "payTo",
        "asset",
    ];

    /// Check invariants that serde alone cannot express.
    pub fn validate(&self) -> CodecResult<()> {
        if self.pay_to.trim().is_empty() {
            return Err(CodecError::MissingField("payTo".into()));
        }
        if self.asset.trim().is_empty() {
            return Err(CodecError::MissingField("asset".into()));
        }
        if self.resource.trim().is_empty() {
            return Err(CodecError::MissingField("resource".into()));
        }
        normalize_resource_url(&self.resource)?;
        Ok(())
    }

    /// Whether `resource` names the same resource as `other` after
    /// normalization.
    pub fn same_resource(&self, other: &str) -> bool {
        match (
            normalize_resource_url(&self.resource),
            normalize_resource_url(other),
        ) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

    /// The `(resource, network, asset, payTo, maxAmountRequired)` tuple a
    /// proof is bound to.
    pub fn binding(&self) -> (&str, &NetworkId, &str, &str, &TokenAmount) {
        (
            &self.resource,
            &self.network,
            &self.asset,
            &self.pay_to,
            &self.max_amount_required,
        )
    }
}

/// The JSON body of a 402 response.
///
/// Carries the active requirements both flattened at the top level and as
/// the first entry of `accepts`, so clients that read either form work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentChallenge {
    /// Protocol version.
    pub x402_version: u32,

    /// The active requirements, flattened.
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<PaymentRequirements>,

    /// Accepted requirements, most preferred first.
    pub accepts: Vec<PaymentRequirements>,

    /// Why the previous attempt failed, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PaymentChallenge {
    /// Build a challenge for one set of requirements.
    pub fn new(requirements: PaymentRequirements, error: Option<ErrorCode>) -> Self {
        Self {
            x402_version: X402_VERSION,
            requirements: Some(requirements.clone()),
            accepts: vec![requirements],
            error: error.map(|code| code.as_str().to_string()),
        }
    }

    /// The requirements a client should pay: `accepts[0]`, else the flattened
    /// top-level copy.
    pub fn active_requirements(&self) -> Option<&PaymentRequirements> {
        self.accepts.first().or(self.requirements.as_ref())
    }

    /// The error, interpreted as a wire code.
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_deref().map(ErrorCode::from_reason)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> CodecResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a 402 body.
    ///
    /// Every `accepts` entry is decoded fail-closed. The flattened copy is
    /// optional and ignored if incomplete.
    pub fn from_json(body: &str) -> CodecResult<Self> {
        let value: Value = serde_json::from_str(body)?;
        let Value::Object(mut object) = value else {
            return Err(CodecError::invalid("challenge", "body is not a JSON object"));
        };

        let x402_version = object
            .remove("x402Version")
            .ok_or_else(|| CodecError::MissingField("x402Version".into()))?
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| CodecError::invalid("x402Version", "not an integer"))?;

        let accepts = match object.remove("accepts") {
            Some(Value::Array(entries)) => entries
                .into_iter()
                .map(crate::codec::decode_value)
                .collect::<CodecResult<Vec<_>>>()?,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => return Err(CodecError::invalid("accepts", "not an array")),
        };

        let error = match object.remove("error") {
            Some(Value::String(s)) => Some(s),
            _ => None,
        };

        let requirements = crate::codec::decode_value(Value::Object(object)).ok();

        if accepts.is_empty() && requirements.is_none() {
            return Err(CodecError::MissingField("accepts".into()));
        }

        Ok(Self {
            x402_version,
            requirements,
            accepts,
            error,
        })
    }
}
