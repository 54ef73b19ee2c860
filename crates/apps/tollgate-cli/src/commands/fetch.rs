//! Fetch a paid resource with a pre-built proof.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use tollgate_negotiator::{CancellationSignal, HttpTransport, Negotiator, NegotiatorConfig};
use tollgate_types::{NetworkId, PaymentProof};

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{FetchOutput, OutputFormat, Render};
use crate::signer::PresignedSigner;

/// Execute the fetch command.
///
/// The proof can be spent once, so it is never re-submitted after a
/// rejection.
pub async fn fetch(
    config: &CliConfig,
    format: OutputFormat,
    url: &str,
    proof: &str,
    proof_network: Option<String>,
    output: Option<PathBuf>,
) -> CliResult<String> {
    let proof =
        PaymentProof::new(proof).map_err(|e| CliError::user(format!("Invalid proof: {}", e)))?;
    let network = NetworkId::parse(proof_network.as_deref().unwrap_or(&config.client.network))?;

    let transport = HttpTransport::with_timeout(Duration::from_secs(config.client.timeout_secs))?;
    let negotiator = Negotiator::with_config(
        transport,
        PresignedSigner::new(proof, network),
        NegotiatorConfig {
            retry_limit: 0,
            signer_timeout_cap_secs: config.client.signer_timeout_cap_secs,
        },
    );

    let cancel = CancellationSignal::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });
    let result = negotiator.fetch(url, &cancel).await;
    interrupt.abort();
    let granted = result?;

    let saved_to = match &output {
        Some(path) => {
            tokio::fs::write(path, &granted.body).await?;
            Some(path.display().to_string())
        }
        None => None,
    };
    let text = match (&output, granted.content_type.as_deref()) {
        (None, Some(content_type)) if is_text(content_type) => {
            std::str::from_utf8(&granted.body).ok().map(str::to_string)
        }
        _ => None,
    };

    let rendered = FetchOutput {
        url: url.to_string(),
        bytes: granted.body.len(),
        content_type: granted.content_type,
        attempts: granted.attempts,
        saved_to,
        receipt: granted.receipt,
        text,
    };
    Ok(rendered.render(format))
}

fn is_text(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.starts_with("text/") || essence == "application/json" || essence.ends_with("+json")
}
