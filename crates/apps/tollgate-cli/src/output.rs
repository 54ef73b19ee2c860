//! Output formatting for CLI.

use colored::Colorize;
use serde::Serialize;

use tollgate_types::{PaymentChallenge, PaymentRequirements, SettlementReceipt};

use crate::config::CliConfig;

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Human => write!(f, "human"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Trait for renderable output.
pub trait Render {
    /// Render as human-readable string.
    fn render_human(&self) -> String;

    /// Render as JSON string.
    fn render_json(&self) -> String;

    /// Render in the specified format.
    fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Human => self.render_human(),
            OutputFormat::Json => self.render_json(),
        }
    }
}

fn requirement_lines(requirements: &PaymentRequirements) -> Vec<String> {
    let mut lines = vec![
        format!("{} {}", "Resource:".bold(), requirements.resource),
        format!(
            "{} {} (smallest units of {})",
            "Amount:".bold(),
            requirements.max_amount_required,
            requirements.asset
        ),
        format!("{} {}", "Network:".bold(), requirements.network),
        format!("{} {}", "Pay to:".bold(), requirements.pay_to),
        format!(
            "{} {}s",
            "Timeout:".bold(),
            requirements.max_timeout_seconds
        ),
    ];
    if !requirements.description.is_empty() {
        lines.push(format!("{} {}", "Description:".bold(), requirements.description));
    }
    if !requirements.mime_type.is_empty() {
        lines.push(format!("{} {}", "Type:".bold(), requirements.mime_type));
    }
    lines
}

// =============================================================================
// Output Types
// =============================================================================

/// Output for the serve command.
#[derive(Debug, Serialize)]
pub struct ServeOutput {
    pub listen: String,
    pub path: String,
    pub network: String,
    pub price: String,
    pub pay_to: String,
}

impl Render for ServeOutput {
    fn render_human(&self) -> String {
        [
            format!(
                "{} http://{}{}",
                "Serving paid resource at".green().bold(),
                self.listen,
                self.path
            ),
            format!("{} {}", "Price:".bold(), self.price),
            format!("{} {}", "Network:".bold(), self.network),
            format!("{} {}", "Pay to:".bold(), self.pay_to),
        ]
        .join("\n")
    }

    fn render_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Output for the challenge command.
#[derive(Debug, Serialize)]
pub struct ChallengeOutput {
    pub url: String,
    pub challenge: PaymentChallenge,
}

impl Render for ChallengeOutput {
    fn render_human(&self) -> String {
        let mut lines = vec![format!(
            "{} {}",
            "Payment required:".yellow().bold(),
            self.url
        )];
        if let Some(error) = &self.challenge.error {
            lines.push(format!("{} {}", "Server error:".red(), error));
        }
        match self.challenge.active_requirements() {
            Some(requirements) => lines.extend(requirement_lines(requirements)),
            None => lines.push("No payment requirements offered".to_string()),
        }
        if self.challenge.accepts.len() > 1 {
            lines.push(format!(
                "{} {} more option(s)",
                "Also accepts:".dimmed(),
                self.challenge.accepts.len() - 1
            ));
        }
        lines.join("\n")
    }

    fn render_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Output for the fetch command.
#[derive(Debug, Serialize)]
pub struct FetchOutput {
    pub url: String,
    pub bytes: usize,
    pub content_type: Option<String>,
    pub attempts: u32,
    pub saved_to: Option<String>,
    pub receipt: Option<SettlementReceipt>,
    /// Body, when it is text and was not saved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Render for FetchOutput {
    fn render_human(&self) -> String {
        let mut lines = vec![format!("{} {}", "Received:".green().bold(), self.url)];
        lines.push(format!(
            "{} {} bytes ({})",
            "Size:".bold(),
            self.bytes,
            self.content_type.as_deref().unwrap_or("unknown type")
        ));
        match &self.receipt {
            Some(receipt) => {
                lines.push(format!("{} {}", "Transaction:".bold(), receipt.transaction));
                lines.push(format!("{} {}", "Network:".bold(), receipt.network));
                if let Some(payer) = &receipt.payer {
                    lines.push(format!("{} {}", "Payer:".bold(), payer));
                }
            }
            None if self.attempts == 0 => lines.push("No payment was required".dimmed().to_string()),
            None => lines.push("Server sent no receipt".yellow().to_string()),
        }
        if let Some(path) = &self.saved_to {
            lines.push(format!("{} {}", "Saved to:".bold(), path));
        }
        if let Some(text) = &self.text {
            lines.push(String::new());
            lines.push(text.clone());
        }
        lines.join("\n")
    }

    fn render_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Output for the config command.
#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    pub path: String,
    pub loaded: bool,
    pub config: CliConfig,
}

impl Render for ConfigOutput {
    fn render_human(&self) -> String {
        let source = if self.loaded {
            self.path.clone()
        } else {
            format!("{} (not found, using defaults)", self.path)
        };
        format!(
            "{} {}\n\n{}",
            "# Configuration from".dimmed(),
            source.dimmed(),
            toml::to_string_pretty(&self.config).unwrap_or_default()
        )
    }

    fn render_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
