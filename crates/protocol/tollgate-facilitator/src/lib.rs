//! Facilitator client for Tollgate.
//!
//! The resource guard never talks to a blockchain. It hands the client's
//! opaque proof, together with the requirements it derived itself, to a
//! [`Facilitator`], which verifies the proof and settles it.
//!
//! # Components
//!
//! - **[`traits`]**: the [`Facilitator`] capability and [`SettlementOutcome`]
//! - **[`http`]**: [`HttpFacilitator`], a reqwest client for x402 v1 facilitators
//! - **[`retry`]**: transport retry with exponential backoff
//! - **[`config`]**: [`FacilitatorConfig`]
//! - **[`types`]**: `/verify`, `/settle` and `/supported` messages
//!
//! # Retry discipline
//!
//! `/verify` has no side effects and is retried on any transient failure.
//! `/settle` moves funds, so it is re-sent only when the previous attempt
//! provably never left the process. Anything else surfaces as an error and
//! the guard answers `verification_unavailable`.

pub mod config;
pub mod error;
pub mod http;
pub mod retry;
pub mod traits;
pub mod types;

// Re-export main types
pub use config::{FacilitatorConfig, RetryConfig, DEFAULT_FACILITATOR_URL, DEFAULT_TIMEOUT_SECS};
pub use error::{FacilitatorError, FacilitatorResult};
pub use http::HttpFacilitator;
pub use retry::RetryPolicy;
pub use traits::{Facilitator, SettlementOutcome};
pub use types::{SettleResponse, SupportedKind, SupportedResponse, VerifyResponse};
