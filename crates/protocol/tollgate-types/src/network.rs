//! Canonical network identifiers.
//!
//! Every network inside Tollgate is a CAIP-2 identifier
//! (`<namespace>:<reference>`, e.g. `eip155:8453`). Some proof builders still
//! expect short legacy names such as `base`; [`NetworkId::to_tag`] and
//! [`NetworkId::from_tag`] are the only place where that translation happens.

use serde::{Deserialize, Serialize};

use crate::constants::{NETWORK_BASE, NETWORK_BASE_SEPOLIA};
use crate::error::{CodecError, CodecResult};

/// Legacy short names and their canonical CAIP-2 form.
const LEGACY_NAMES: &[(&str, &str)] = &[
    ("base", NETWORK_BASE),
    ("base-sepolia", NETWORK_BASE_SEPOLIA),
    ("avalanche", "eip155:43114"),
    ("avalanche-fuji", "eip155:43113"),
    ("polygon", "eip155:137"),
    ("polygon-amoy", "eip155:80002"),
];

/// How a collaborator expects network identifiers to be spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkTagFormat {
    /// CAIP-2, the canonical form.
    #[default]
    Caip2,
    /// Short legacy names (`base`, `base-sepolia`, ...).
    LegacyName,
}

/// A validated CAIP-2 chain identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NetworkId(String);

impl NetworkId {
    /// Parse a CAIP-2 identifier.
    ///
    /// Namespace: 3-8 chars of `[-a-z0-9]`. Reference: 1-32 chars of
    /// `[-_a-zA-Z0-9]`.
    pub fn parse(value: &str) -> CodecResult<Self> {
        let (namespace, reference) = value
            .split_once(':')
            .ok_or_else(|| CodecError::invalid("network", format!("'{value}' is not CAIP-2")))?;

        let namespace_ok = (3..=8).contains(&namespace.len())
            && namespace
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !namespace_ok {
            return Err(CodecError::invalid(
                "network",
                format!("invalid namespace '{namespace}'"),
            ));
        }

        let reference_ok = (1..=32).contains(&reference.len())
            && reference
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !reference_ok {
            return Err(CodecError::invalid(
                "network",
                format!("invalid reference '{reference}'"),
            ));
        }

        Ok(Self(value.to_string()))
    }

    /// Base mainnet.
    pub fn base() -> Self {
        Self(NETWORK_BASE.to_string())
    }

    /// Base Sepolia testnet.
    pub fn base_sepolia() -> Self {
        Self(NETWORK_BASE_SEPOLIA.to_string())
    }

    /// An EVM chain by numeric chain id.
    pub fn eip155(chain_id: u64) -> Self {
        Self(format!("eip155:{chain_id}"))
    }

    /// The namespace part (`eip155`).
    pub fn namespace(&self) -> &str {
        self.0.split_once(':').map(|(ns, _)| ns).unwrap_or_default()
    }

    /// The reference part (`8453`).
    pub fn reference(&self) -> &str {
        self.0.split_once(':').map(|(_, r)| r).unwrap_or_default()
    }

    /// Numeric chain id for `eip155` networks.
    pub fn chain_id(&self) -> Option<u64> {
        if self.namespace() == "eip155" {
            self.reference().parse().ok()
        } else {
            None
        }
    }

    /// The canonical string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Spell this network the way a collaborator expects.
    ///
    /// Returns `None` when the collaborator wants a legacy name and this
    /// network has none.
    pub fn to_tag(&self, format: NetworkTagFormat) -> Option<String> {
        match format {
            NetworkTagFormat::Caip2 => Some(self.0.clone()),
            NetworkTagFormat::LegacyName => LEGACY_NAMES
                .iter()
                .find(|(_, caip2)| *caip2 == self.0)
                .map(|(name, _)| name.to_string()),
        }
    }

    /// Read a collaborator's network tag back into canonical form.
    pub fn from_tag(tag: &str, format: NetworkTagFormat) -> CodecResult<Self> {
        match format {
            NetworkTagFormat::Caip2 => Self::parse(tag),
            NetworkTagFormat::LegacyName => LEGACY_NAMES
                .iter()
                .find(|(name, _)| *name == tag)
                .map(|(_, caip2)| Self(caip2.to_string()))
                .ok_or_else(|| {
                    CodecError::invalid("network", format!("unknown legacy network '{tag}'"))
                }),
        }
    }
}

impl TryFrom<String> for NetworkId {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<NetworkId> for String {
    fn from(value: NetworkId) -> Self {
        value.0
    }
}

impl std::str::FromStr for NetworkId {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for NetworkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
