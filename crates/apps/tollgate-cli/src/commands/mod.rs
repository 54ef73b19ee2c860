//! CLI command implementations.

pub mod challenge;
pub mod fetch;
pub mod serve;
pub mod show_config;

// Re-export command handlers
pub use challenge::challenge;
pub use fetch::fetch;
pub use serve::serve;
pub use show_config::show_config;
