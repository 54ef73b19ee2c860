//! Shared test utilities for Tollgate.
//!
//! Mocks for both collaborators of the protocol crates, in-process
//! transports that wire a negotiator to a guard, and common fixtures.

pub mod helpers;
pub mod mock_facilitator;
pub mod mock_signer;
pub mod transports;

pub use helpers::*;
pub use mock_facilitator::{MockFacilitator, SettlementRecord, MOCK_PAYER};
pub use mock_signer::{sign_proof, unix_now, MockAuthorization, MockPayload, MockSigner};
pub use transports::{challenge_response, ok_response, GuardTransport, ScriptedTransport};
