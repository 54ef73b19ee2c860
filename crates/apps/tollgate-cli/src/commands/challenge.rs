//! Show the payment challenge of a URL.

use std::time::Duration;

use tracing::debug;

use tollgate_negotiator::{
    HttpTransport, NegotiationError, ResourceRequest, Transport, TransportResponse,
};
use tollgate_types::PaymentChallenge;

use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::{ChallengeOutput, OutputFormat, Render};

/// Execute the challenge command.
pub async fn challenge(config: &CliConfig, format: OutputFormat, url: &str) -> CliResult<String> {
    let transport = HttpTransport::with_timeout(Duration::from_secs(config.client.timeout_secs))?;
    let response = transport.send(ResourceRequest::new(url)).await?;
    debug!(url = %url, status = %response.status, "Challenge response");

    let output = ChallengeOutput {
        url: url.to_string(),
        challenge: decode_challenge(&response)?,
    };
    Ok(output.render(format))
}

/// Decode a 402 response.
pub fn decode_challenge(response: &TransportResponse) -> Result<PaymentChallenge, NegotiationError> {
    if response.status.as_u16() != 402 {
        return Err(NegotiationError::UnexpectedStatus {
            status: response.status.as_u16(),
        });
    }
    let body = std::str::from_utf8(&response.body)
        .map_err(|e| NegotiationError::MalformedChallenge(e.to_string()))?;
    PaymentChallenge::from_json(body).map_err(|e| NegotiationError::MalformedChallenge(e.to_string()))
}
