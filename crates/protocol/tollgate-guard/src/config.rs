//! Resource server configuration.
//!
//! Built once at startup and handed to [`ResourceGuard`]. Request handling
//! never reads the environment.
//!
//! [`ResourceGuard`]: crate::ResourceGuard

use serde::{Deserialize, Serialize};
use tollgate_facilitator::FacilitatorConfig;
use tollgate_types::{
    NetworkId, TokenAmount, DEFAULT_MAX_TIMEOUT_SECONDS, USDC_BASE, USDC_BASE_SEPOLIA,
    USDC_DECIMALS,
};

use crate::error::{GuardError, GuardResult};

/// Default price in asset units.
pub const DEFAULT_PRICE: &str = "0.10";

/// Default MIME type of protected resources.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// The token a resource is priced in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Token contract address
    pub address: String,
    /// Decimals of the token
    pub decimals: u8,
    /// EIP-712 domain name
    pub name: String,
    /// EIP-712 domain version
    pub version: String,
}

impl AssetConfig {
    /// USDC on Base mainnet.
    pub fn usdc_base() -> Self {
        Self {
            address: USDC_BASE.to_string(),
            decimals: USDC_DECIMALS,
            name: "USD Coin".to_string(),
            version: "2".to_string(),
        }
    }

    /// USDC on Base Sepolia.
    pub fn usdc_base_sepolia() -> Self {
        Self {
            address: USDC_BASE_SEPOLIA.to_string(),
            decimals: USDC_DECIMALS,
            name: "USDC".to_string(),
            version: "2".to_string(),
        }
    }
}

/// Static configuration of a paid resource.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Recipient address
    pub pay_to: String,
    /// Network payments are accepted on
    pub network: NetworkId,
    /// Token payments are made in
    pub asset: AssetConfig,
    /// Price in asset units, as a decimal string (`"0.10"`)
    pub price: String,
    /// Human-readable description
    pub description: String,
    /// MIME type of the resource body
    pub mime_type: String,
    /// How long a client has to present a proof
    pub max_timeout_seconds: u64,
    /// Facilitator connection
    pub facilitator: FacilitatorConfig,
    /// Scheme used for resource URLs when the request carries no
    /// `X-Forwarded-Proto`
    pub public_scheme: String,
}

/// Pricing derived from a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPricing {
    /// Price in the asset's smallest unit
    pub max_amount_required: TokenAmount,
}

impl ServerConfig {
    /// Accept USDC on Base mainnet.
    pub fn base_usdc(pay_to: impl Into<String>, credential: impl Into<String>) -> Self {
        Self::preset(pay_to, credential, NetworkId::base(), AssetConfig::usdc_base())
    }

    /// Accept USDC on Base Sepolia.
    pub fn base_sepolia_usdc(pay_to: impl Into<String>, credential: impl Into<String>) -> Self {
        Self::preset(
            pay_to,
            credential,
            NetworkId::base_sepolia(),
            AssetConfig::usdc_base_sepolia(),
        )
    }

    fn preset(
        pay_to: impl Into<String>,
        credential: impl Into<String>,
        network: NetworkId,
        asset: AssetConfig,
    ) -> Self {
        let mut facilitator = FacilitatorConfig::default();
        facilitator.api_key = Some(credential.into());

        Self {
            pay_to: pay_to.into(),
            network,
            asset,
            price: DEFAULT_PRICE.to_string(),
            description: String::new(),
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            max_timeout_seconds: DEFAULT_MAX_TIMEOUT_SECONDS,
            facilitator,
            public_scheme: "https".to_string(),
        }
    }

    /// Set the price (builder style).
    pub fn with_price(mut self, price: impl Into<String>) -> Self {
        self.price = price.into();
        self
    }

    /// Set the description and MIME type (builder style).
    pub fn with_resource_info(
        mut self,
        description: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        self.description = description.into();
        self.mime_type = mime_type.into();
        self
    }

    /// Set the facilitator connection (builder style).
    pub fn with_facilitator(mut self, facilitator: FacilitatorConfig) -> Self {
        self.facilitator = facilitator;
        self
    }

    /// Set the public scheme (builder style).
    pub fn with_public_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.public_scheme = scheme.into();
        self
    }

    /// Validate the configuration and derive the price in smallest units.
    pub fn validate(&self) -> GuardResult<ValidatedPricing> {
        if self.pay_to.trim().is_empty() {
            return Err(GuardError::config("recipient address (pay_to) is not set"));
        }
        if !self.facilitator.has_credential() {
            return Err(GuardError::config("facilitator credential is not set"));
        }
        self.facilitator
            .validate()
            .map_err(|e| GuardError::config(e.to_string()))?;
        let format = self.facilitator.network_format;
        if self.network.to_tag(format).is_none() {
            return Err(GuardError::config(format!(
                "network {} cannot be named to the facilitator in {:?} form",
                self.network, format
            )));
        }
        if self.asset.address.trim().is_empty() {
            return Err(GuardError::config("asset address is not set"));
        }
        if !matches!(self.public_scheme.as_str(), "http" | "https") {
            return Err(GuardError::config(format!(
                "public_scheme must be http or https, got '{}'",
                self.public_scheme
            )));
        }
        if self.max_timeout_seconds == 0 {
            return Err(GuardError::config("max_timeout_seconds must be positive"));
        }

        let max_amount_required = TokenAmount::from_decimal(&self.price, self.asset.decimals)
            .map_err(|e| GuardError::config(e.to_string()))?;

        Ok(ValidatedPricing {
            max_amount_required,
        })
    }
}
