//! The resource guard.
//!
//! Per request the guard either challenges (402) or, given a proof, makes
//! exactly one `verify_and_settle` call and serves the resource if it
//! settled. Requirements are always re-derived from the live request and
//! the static configuration; nothing the client sends is trusted for them.

use std::future::Future;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE, HOST};
use http::request::Parts;
use http::{Response, StatusCode};
use serde_json::{json, Map, Value};
use tracing::{debug, error, info, warn};

use tollgate_facilitator::Facilitator;
use tollgate_types::{
    canonical_resource_url, ErrorCode, PaymentChallenge, PaymentProof, PaymentRequirements,
    Scheme, SettlementReceipt, HEADER_PAYMENT,
};

use crate::config::{ServerConfig, ValidatedPricing, DEFAULT_MIME_TYPE};
use crate::error::{GuardError, GuardResult};

/// `X-PAYMENT-RESPONSE`, the verification marker header.
pub static PAYMENT_RESPONSE: HeaderName = HeaderName::from_static("x-payment-response");

static FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Guards one paid resource.
pub struct ResourceGuard<F> {
    /// Static configuration
    config: ServerConfig,
    /// Pricing, or the reason the configuration is unusable
    pricing: Result<ValidatedPricing, GuardError>,
    /// Facilitator for verification and settlement
    facilitator: F,
}

impl<F: Facilitator> ResourceGuard<F> {
    /// Create a guard.
    ///
    /// An invalid configuration does not fail construction; every request is
    /// then answered with 500 `configuration_error`.
    pub fn new(config: ServerConfig, facilitator: F) -> Self {
        let pricing = config.validate();
        if let Err(e) = &pricing {
            error!(error = %e, "Resource guard misconfigured; all requests will fail");
        }
        Self {
            config,
            pricing,
            facilitator,
        }
    }

    /// Create a guard, failing if the configuration is invalid.
    pub fn try_new(config: ServerConfig, facilitator: F) -> GuardResult<Self> {
        config.validate()?;
        Ok(Self::new(config, facilitator))
    }

    /// The static configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The facilitator.
    pub fn facilitator(&self) -> &F {
        &self.facilitator
    }

    /// Canonical URL of the resource a request addresses.
    ///
    /// Scheme comes from `X-Forwarded-Proto`, then the request URI, then the
    /// configured public scheme. Host comes from the `Host` header, then the
    /// request URI.
    pub fn resource_url(&self, parts: &Parts) -> GuardResult<String> {
        let forwarded = parts
            .headers
            .get(&FORWARDED_PROTO)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| v == "http" || v == "https");
        let scheme = forwarded
            .or_else(|| parts.uri.scheme_str().map(str::to_ascii_lowercase))
            .unwrap_or_else(|| self.config.public_scheme.clone());

        let host = parts
            .headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| parts.uri.authority().map(|a| a.as_str().to_string()))
            .ok_or_else(|| GuardError::bad_request("request has no Host header"))?;

        Ok(canonical_resource_url(&scheme, &host, parts.uri.path())?)
    }

    /// Build fresh requirements for a request.
    pub fn requirements_for(&self, parts: &Parts) -> GuardResult<PaymentRequirements> {
        let pricing = self.pricing.as_ref().map_err(Clone::clone)?;
        let resource = self.resource_url(parts)?;

        let mut extra = Map::new();
        extra.insert("name".into(), Value::String(self.config.asset.name.clone()));
        extra.insert(
            "version".into(),
            Value::String(self.config.asset.version.clone()),
        );

        Ok(PaymentRequirements {
            scheme: Scheme::Exact,
            network: self.config.network.clone(),
            max_amount_required: pricing.max_amount_required.clone(),
            resource,
            description: self.config.description.clone(),
            mime_type: self.config.mime_type.clone(),
            pay_to: self.config.pay_to.clone(),
            max_timeout_seconds: self.config.max_timeout_seconds,
            asset: self.config.asset.address.clone(),
            extra: Some(extra),
        })
    }

    /// Handle one request for the resource.
    ///
    /// `load` produces the resource body and is only invoked after the
    /// payment settled.
    pub async fn handle<L, Fut, E>(&self, parts: &Parts, load: L) -> Response<Bytes>
    where
        L: FnOnce() -> Fut,
        Fut: Future<Output = Result<Bytes, E>>,
        E: std::fmt::Display,
    {
        if let Err(e) = &self.pricing {
            return error_response(e);
        }

        let requirements = match self.requirements_for(parts) {
            Ok(requirements) => requirements,
            Err(e) => {
                warn!(error = %e, "Cannot derive payment requirements");
                return error_response(&e);
            }
        };

        let Some(header) = parts.headers.get(HEADER_PAYMENT) else {
            debug!(resource = %requirements.resource, "No payment header, issuing challenge");
            return challenge_response(requirements, None);
        };

        let proof = match header.to_str().map(PaymentProof::new) {
            Ok(Ok(proof)) => proof,
            _ => {
                warn!(resource = %requirements.resource, "Malformed payment header");
                return challenge_response(requirements, Some(ErrorCode::InvalidPayload));
            }
        };
        let proof_id = proof.proof_id();

        debug!(
            resource = %requirements.resource,
            proof_id = %proof_id,
            "Verifying and settling payment"
        );
        let outcome = match self
            .facilitator
            .verify_and_settle(&proof, &requirements)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    resource = %requirements.resource,
                    proof_id = %proof_id,
                    error = %e,
                    "Facilitator unavailable"
                );
                return challenge_response(requirements, Some(ErrorCode::VerificationUnavailable));
            }
        };

        if !outcome.settled {
            let code = outcome.error_code.unwrap_or(ErrorCode::InvalidPayload);
            warn!(
                resource = %requirements.resource,
                proof_id = %proof_id,
                code = %code,
                "Payment rejected"
            );
            return challenge_response(requirements, Some(code));
        }

        let receipt = outcome.receipt.unwrap_or_else(|| SettlementReceipt {
            success: true,
            transaction: String::new(),
            network: requirements.network.clone(),
            payer: None,
        });
        info!(
            resource = %requirements.resource,
            proof_id = %proof_id,
            transaction = %receipt.transaction,
            "Payment settled, serving resource"
        );

        match load().await {
            Ok(body) => paid_response(&self.config.mime_type, body, &receipt),
            Err(e) => {
                error!(
                    resource = %requirements.resource,
                    proof_id = %proof_id,
                    transaction = %receipt.transaction,
                    error = %e,
                    "Resource unavailable after settlement; payment needs reconciliation"
                );
                let mut response = error_response(&GuardError::content(e.to_string()));
                if let Some(value) = receipt_header(&receipt) {
                    response.headers_mut().insert(PAYMENT_RESPONSE.clone(), value);
                }
                response
            }
        }
    }
}

impl<F> std::fmt::Debug for ResourceGuard<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceGuard")
            .field("config", &self.config)
            .field("configured", &self.pricing.is_ok())
            .finish()
    }
}

fn json_response(status: StatusCode, body: Vec<u8>) -> Response<Bytes> {
    let mut response = Response::new(Bytes::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn challenge_response(
    requirements: PaymentRequirements,
    error: Option<ErrorCode>,
) -> Response<Bytes> {
    let challenge = PaymentChallenge::new(requirements, error);
    match serde_json::to_vec(&challenge) {
        Ok(body) => json_response(StatusCode::PAYMENT_REQUIRED, body),
        Err(e) => error_response(&GuardError::content(e.to_string())),
    }
}

fn error_response(error: &GuardError) -> Response<Bytes> {
    let status =
        StatusCode::from_u16(error.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = json!({ "error": error.code(), "message": error.to_string() });
    json_response(status, body.to_string().into_bytes())
}

fn receipt_header(receipt: &SettlementReceipt) -> Option<HeaderValue> {
    receipt
        .to_header()
        .ok()
        .and_then(|encoded| HeaderValue::from_str(&encoded).ok())
}

fn paid_response(mime_type: &str, body: Bytes, receipt: &SettlementReceipt) -> Response<Bytes> {
    let mut response = Response::new(body);
    let content_type = HeaderValue::from_str(mime_type)
        .ok()
        .filter(|_| !mime_type.is_empty())
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_MIME_TYPE));
    response.headers_mut().insert(CONTENT_TYPE, content_type);
    if let Some(value) = receipt_header(receipt) {
        response.headers_mut().insert(PAYMENT_RESPONSE.clone(), value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tollgate_facilitator::{FacilitatorError, FacilitatorResult, SettlementOutcome};
    use tollgate_types::NetworkId;

    /// Answers every proof with a fixed outcome and counts calls.
    struct FixedFacilitator {
        outcome: fn() -> FacilitatorResult<SettlementOutcome>,
        calls: AtomicU32,
    }

    impl FixedFacilitator {
        fn new(outcome: fn() -> FacilitatorResult<SettlementOutcome>) -> Self {
            Self {
                outcome,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl Facilitator for FixedFacilitator {
        async fn verify_and_settle(
            &self,
            _proof: &PaymentProof,
            _requirements: &PaymentRequirements,
        ) -> FacilitatorResult<SettlementOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }
    }

    fn settled() -> FacilitatorResult<SettlementOutcome> {
        Ok(SettlementOutcome::settled(SettlementReceipt {
            success: true,
            transaction: "0xabc".into(),
            network: NetworkId::base(),
            payer: None,
        }))
    }

    fn config() -> ServerConfig {
        ServerConfig::base_usdc("0x209693Bc6afc0C5328bA36FaF03C514EF312287C", "key")
            .with_resource_info("Premium video", "video/mp4")
            .with_public_scheme("http")
    }

    fn parts(uri: &str, headers: &[(&str, &str)]) -> Parts {
        let mut builder = http::Request::builder().uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    async fn ok_body() -> Result<Bytes, std::io::Error> {
        Ok(Bytes::from_static(b"video-bytes"))
    }

    #[test]
    fn test_resource_url_derivation() {
        let guard = ResourceGuard::new(config(), FixedFacilitator::new(settled));

        let p = parts("/api/video/?t=1", &[("host", "Localhost:3000")]);
        assert_eq!(
            guard.resource_url(&p).unwrap(),
            "http://localhost:3000/api/video"
        );

        let p = parts(
            "/api/video",
            &[("host", "example.com"), ("x-forwarded-proto", "https, http")],
        );
        assert_eq!(guard.resource_url(&p).unwrap(), "https://example.com/api/video");

        let p = parts("https://cdn.example.com/v", &[]);
        assert_eq!(guard.resource_url(&p).unwrap(), "https://cdn.example.com/v");

        let p = parts("/api/video", &[]);
        assert!(matches!(
            guard.resource_url(&p),
            Err(GuardError::BadRequest(_))
        ));
    }

    #[test]
    fn test_requirements_carry_signing_domain() {
        let guard = ResourceGuard::new(config(), FixedFacilitator::new(settled));
        let req = guard
            .requirements_for(&parts("/api/video", &[("host", "localhost:3000")]))
            .unwrap();
        let extra = req.extra.unwrap();
        assert_eq!(extra["name"], "USD Coin");
        assert_eq!(extra["version"], "2");
        assert_eq!(req.max_amount_required.as_str(), "100000");
    }

    #[tokio::test]
    async fn test_misconfigured_guard_answers_500_without_calling_facilitator() {
        let guard = ResourceGuard::new(
            ServerConfig::base_usdc("", "key"),
            FixedFacilitator::new(settled),
        );
        let p = parts(
            "/api/video",
            &[("host", "localhost:3000"), ("x-payment", "cHJvb2Y=")],
        );
        let response = guard.handle(&p, ok_body).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["error"], "configuration_error");
        assert_eq!(guard.facilitator().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_try_new_rejects_bad_config() {
        let result = ResourceGuard::try_new(
            ServerConfig::base_usdc("0xmerchant", ""),
            FixedFacilitator::new(settled),
        );
        assert!(matches!(result, Err(GuardError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_non_ascii_header_is_invalid_payload() {
        let guard = ResourceGuard::new(config(), FixedFacilitator::new(settled));
        let mut p = parts("/api/video", &[("host", "localhost:3000")]);
        p.headers.insert(
            "x-payment",
            HeaderValue::from_bytes(b"caf\xe9").unwrap(),
        );

        let response = guard.handle(&p, ok_body).await;
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["error"], "invalid_payload");
        assert_eq!(guard.facilitator().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_loader_not_called_without_settlement() {
        let guard = ResourceGuard::new(
            config(),
            FixedFacilitator::new(|| Err(FacilitatorError::timeout("slow"))),
        );
        let p = parts(
            "/api/video",
            &[("host", "localhost:3000"), ("x-payment", "cHJvb2Y=")],
        );
        let loaded = AtomicU32::new(0);

        let response = guard
            .handle(&p, || async {
                loaded.fetch_add(1, Ordering::SeqCst);
                ok_body().await
            })
            .await;

        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(loaded.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_loader_failure_after_settlement_keeps_receipt() {
        let guard = ResourceGuard::new(config(), FixedFacilitator::new(settled));
        let p = parts(
            "/api/video",
            &[("host", "localhost:3000"), ("x-payment", "cHJvb2Y=")],
        );

        let response = guard
            .handle(&p, || async {
                Err::<Bytes, _>(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))
            })
            .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().contains_key(&PAYMENT_RESPONSE));
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["error"], "content_unavailable");
    }

    #[tokio::test]
    async fn test_settled_without_receipt_still_marks_response() {
        let guard = ResourceGuard::new(
            config(),
            FixedFacilitator::new(|| {
                Ok(SettlementOutcome {
                    settled: true,
                    error_code: None,
                    receipt: None,
                })
            }),
        );
        let p = parts(
            "/api/video",
            &[("host", "localhost:3000"), ("x-payment", "cHJvb2Y=")],
        );

        let response = guard.handle(&p, ok_body).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "video/mp4");
        assert!(response.headers().contains_key(&PAYMENT_RESPONSE));
    }
}
