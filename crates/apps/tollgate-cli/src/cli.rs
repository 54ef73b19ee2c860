//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::ConfigOverrides;
use crate::output::OutputFormat;

/// Tollgate x402 CLI.
#[derive(Parser, Debug)]
#[command(name = "tollgate")]
#[command(author = "Tollgate Contributors")]
#[command(version)]
#[command(about = "Serve and fetch resources behind HTTP 402 payments")]
#[command(
    long_about = "Tollgate implements the x402 protocol: resources answer 402 Payment Required \
                  with payment requirements, and clients retry with a signed payment proof.\n\n\
                  Run 'tollgate serve' to protect a file, or 'tollgate challenge <URL>' to inspect one."
)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (human or json).
    #[arg(short, long, global = true, default_value = "human")]
    pub format: OutputFormatArg,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Recipient address for payments.
    #[arg(long, global = true, env = "TOLLGATE_PAY_TO")]
    pub pay_to: Option<String>,

    /// Facilitator credential.
    #[arg(long, global = true, env = "TOLLGATE_FACILITATOR_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Payment network (CAIP-2, e.g. eip155:8453).
    #[arg(long, global = true, env = "TOLLGATE_NETWORK")]
    pub network: Option<String>,

    /// Price in asset units (e.g. 0.10).
    #[arg(long, global = true, env = "TOLLGATE_PRICE")]
    pub price: Option<String>,
}

impl Cli {
    /// Flag and environment overrides for the config file.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            pay_to: self.pay_to.clone(),
            api_key: self.api_key.clone(),
            network: self.network.clone(),
            price: self.price.clone(),
        }
    }
}

/// Output format argument for clap.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormatArg {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

/// CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    // =========================================================================
    // Server Commands
    // =========================================================================
    /// Serve a paid resource.
    ///
    /// Answers unpaid requests with 402 and serves the file once a payment
    /// settles through the configured facilitator.
    Serve {
        /// Address to listen on (default from config).
        #[arg(short, long)]
        listen: Option<String>,

        /// Route of the paid resource (default from config).
        #[arg(short, long)]
        path: Option<String>,

        /// File to serve (default from config).
        #[arg(long)]
        file: Option<PathBuf>,
    },

    // =========================================================================
    // Client Commands
    // =========================================================================
    /// Show the payment challenge of a URL.
    ///
    /// Requests the URL without payment and prints the decoded requirements.
    Challenge {
        /// URL of the paid resource.
        url: String,
    },

    /// Fetch a paid resource with a pre-built payment proof.
    ///
    /// The proof is presented only if the server's requirements are on the
    /// proof's network; it is never re-sent after a rejection.
    Fetch {
        /// URL of the paid resource.
        url: String,

        /// Base64 X-PAYMENT value.
        #[arg(long, env = "TOLLGATE_PROOF", hide_env_values = true)]
        proof: String,

        /// Network the proof was signed for (default from config).
        #[arg(long)]
        proof_network: Option<String>,

        /// Write the resource to this file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    // =========================================================================
    // Configuration Commands
    // =========================================================================
    /// Show the effective configuration.
    ///
    /// Credentials are redacted.
    Config,
}
