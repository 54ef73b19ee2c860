//! Protocol constants.

/// x402 protocol version spoken by this crate.
pub const X402_VERSION: u32 = 1;

/// Request header carrying the client's payment proof.
pub const HEADER_PAYMENT: &str = "X-PAYMENT";

/// Response header carrying the settlement receipt (verification marker).
pub const HEADER_PAYMENT_RESPONSE: &str = "X-PAYMENT-RESPONSE";

/// Default time a client has to present a proof after a challenge (seconds).
pub const DEFAULT_MAX_TIMEOUT_SECONDS: u64 = 60;

/// Base mainnet (CAIP-2).
pub const NETWORK_BASE: &str = "eip155:8453";

/// Base Sepolia testnet (CAIP-2).
pub const NETWORK_BASE_SEPOLIA: &str = "eip155:84532";

/// USDC contract on Base mainnet.
pub const USDC_BASE: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";

/// USDC contract on Base Sepolia.
pub const USDC_BASE_SEPOLIA: &str = "0x036CbD53842c5426634e7929541eC2318f3dCF7e";

/// USDC decimals.
pub const USDC_DECIMALS: u8 = 6;
