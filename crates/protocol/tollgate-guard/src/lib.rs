//! Server-side resource guard for Tollgate.
//!
//! A [`ResourceGuard`] protects one resource behind an HTTP 402 challenge.
//!
//! ```text
//! request ─┬─ no X-PAYMENT ──────────────→ 402 {x402Version, ...requirements, accepts}
//!          │
//!          └─ X-PAYMENT ── verify_and_settle (once)
//!                             ├─ settled ──→ 200 body + X-PAYMENT-RESPONSE
//!                             ├─ rejected ─→ 402 + error code
//!                             └─ Err ──────→ 402 verification_unavailable
//! ```
//!
//! A misconfigured guard answers 500 `configuration_error` before any of
//! the above.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bytes::Bytes;
//! use tollgate_facilitator::HttpFacilitator;
//! use tollgate_guard::{route, ResourceGuard, ServerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::base_sepolia_usdc("0xYourAddress", "facilitator-key")
//!     .with_resource_info("Premium video", "video/mp4");
//! let facilitator = HttpFacilitator::new(&config.facilitator)?;
//! let guard = Arc::new(ResourceGuard::try_new(config, facilitator)?);
//!
//! let app = route::router("/video", guard, || async {
//!     tokio::fs::read("video.mp4").await.map(Bytes::from)
//! });
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod guard;
#[cfg(feature = "axum")]
pub mod route;

// Re-export main types
pub use config::{AssetConfig, ServerConfig, ValidatedPricing, DEFAULT_MIME_TYPE, DEFAULT_PRICE};
pub use error::{GuardError, GuardResult};
pub use guard::{ResourceGuard, PAYMENT_RESPONSE};
#[cfg(feature = "axum")]
pub use route::{paid_route, router, MAX_ECHO_BYTES};
