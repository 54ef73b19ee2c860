//! Command-line interface for Tollgate.
//!
//! This crate provides the `tollgate` binary:
//!
//! - **serve**: protect a file behind an x402 payment
//! - **challenge**: show what a URL asks to be paid
//! - **fetch**: present a pre-built payment proof and download the resource
//! - **config**: print the effective configuration
//!
//! # Quick Start
//!
//! ```bash
//! # Serve a file on Base Sepolia
//! export TOLLGATE_FACILITATOR_API_KEY=...
//! tollgate serve --pay-to 0xYourAddress --file video.mp4
//!
//! # Inspect the challenge
//! tollgate challenge http://127.0.0.1:3000/video
//! ```
//!
//! # Output Formats
//!
//! All commands support `--format`:
//!
//! - `human` (default): Human-readable with colors
//! - `json`: Machine-readable JSON
//!
//! # Configuration
//!
//! Configuration is loaded from `./tollgate.toml`. Override with `--config`.
//! `${VAR}` references in the file are expanded from the environment, and
//! `TOLLGATE_*` variables override file values.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod signer;

// Re-export main types
pub use cli::{Cli, Commands, OutputFormatArg};
pub use config::{CliConfig, ConfigOverrides};
pub use error::{CliError, CliResult};
pub use output::{OutputFormat, Render};
pub use signer::PresignedSigner;
