//! Protocol types for Tollgate, an HTTP 402 ("x402") payment gate.
//!
//! This crate holds everything both sides of the exchange must agree on:
//!
//! - **[`requirements`]**: [`PaymentRequirements`] and the 402 body, [`PaymentChallenge`]
//! - **[`codec`]**: fail-closed JSON and header encoding of requirements
//! - **[`proof`]**: the opaque [`PaymentProof`] and the [`SettlementReceipt`] marker
//! - **[`network`]**: canonical CAIP-2 [`NetworkId`] and the legacy-name adapter
//! - **[`amount`]**: smallest-unit [`TokenAmount`]
//! - **[`resource`]**: canonical resource URLs
//! - **[`error`]**: wire [`ErrorCode`]s and the [`ErrorCategory`] taxonomy
//!
//! # Example
//!
//! ```rust
//! use tollgate_types::{codec, NetworkId, PaymentRequirements, Scheme, TokenAmount};
//!
//! let requirements = PaymentRequirements {
//!     scheme: Scheme::Exact,
//!     network: NetworkId::base(),
//!     max_amount_required: TokenAmount::from_decimal("0.10", 6).unwrap(),
//!     resource: "https://example.com/video".into(),
//!     description: "Premium video".into(),
//!     mime_type: "video/mp4".into(),
//!     pay_to: "0x209693Bc6afc0C5328bA36FaF03C514EF312287C".into(),
//!     max_timeout_seconds: 60,
//!     asset: tollgate_types::USDC_BASE.into(),
//!     extra: None,
//! };
//!
//! let json = codec::encode(&requirements).unwrap();
//! assert_eq!(codec::decode(&json).unwrap(), requirements);
//! ```

pub mod amount;
pub mod codec;
pub mod constants;
pub mod error;
pub mod network;
pub mod proof;
pub mod requirements;
pub mod resource;

// Re-export main types
pub use amount::TokenAmount;
pub use constants::{
    DEFAULT_MAX_TIMEOUT_SECONDS, HEADER_PAYMENT, HEADER_PAYMENT_RESPONSE, NETWORK_BASE,
    NETWORK_BASE_SEPOLIA, USDC_BASE, USDC_BASE_SEPOLIA, USDC_DECIMALS, X402_VERSION,
};
pub use error::{CodecError, CodecResult, ErrorCategory, ErrorCode};
pub use network::{NetworkId, NetworkTagFormat};
pub use proof::{PaymentProof, SettlementReceipt};
pub use requirements::{PaymentChallenge, PaymentRequirements, Scheme};
pub use resource::{canonical_resource_url, normalize_resource_url};
