//! Client-side payment negotiator for Tollgate.
//!
//! A [`Negotiator`] fetches a URL and, when the server answers 402, asks a
//! [`Signer`] for a proof against the challenge's requirements and retries.
//! Its progress is published as a [`NegotiationState`] so a UI can render it
//! without driving it.
//!
//! # Components
//!
//! - **[`negotiator`]**: the state machine
//! - **[`signer`]**: the wallet collaborator
//! - **[`transport`]**: the HTTP collaborator and a reqwest implementation
//! - **[`cancel`]**: external cancellation
//! - **[`state`]**: published states
//! - **[`error`]**: errors, each mapped to an [`ErrorCategory`]
//!
//! # Example
//!
//! ```rust,no_run
//! use tollgate_negotiator::{CancellationSignal, HttpTransport, Negotiator, Signer};
//!
//! # async fn example(wallet: impl Signer) -> Result<(), Box<dyn std::error::Error>> {
//! let negotiator = Negotiator::new(HttpTransport::new()?, wallet);
//!
//! let mut states = negotiator.subscribe();
//! tokio::spawn(async move {
//!     while states.changed().await.is_ok() {
//!         println!("{}", *states.borrow());
//!     }
//! });
//!
//! let granted = negotiator
//!     .fetch("https://example.com/video", &CancellationSignal::new())
//!     .await?;
//! println!("{} bytes", granted.body.len());
//! # Ok(())
//! # }
//! ```
//!
//! [`ErrorCategory`]: tollgate_types::ErrorCategory

pub mod cancel;
pub mod error;
pub mod negotiator;
pub mod signer;
pub mod state;
pub mod transport;

// Re-export main types
pub use cancel::CancellationSignal;
pub use error::{NegotiationError, NegotiationResult, SignerError, SignerResult, TransportError};
pub use negotiator::{
    GrantedResource, Negotiator, NegotiatorConfig, DEFAULT_RETRY_LIMIT,
    DEFAULT_SIGNER_TIMEOUT_CAP_SECS,
};
pub use signer::Signer;
pub use state::NegotiationState;
pub use transport::{HttpTransport, ResourceRequest, Transport, TransportResponse};
