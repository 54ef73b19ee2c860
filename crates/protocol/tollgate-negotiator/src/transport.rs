//! HTTP transport to the resource server.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, StatusCode};
use reqwest::Client;
use tracing::debug;

use tollgate_types::{PaymentProof, SettlementReceipt, HEADER_PAYMENT, HEADER_PAYMENT_RESPONSE};

use crate::error::TransportError;

/// Default timeout for resource requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A request for a protected resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    /// Absolute URL
    pub url: String,
    /// Proof to present in `X-PAYMENT`
    pub payment: Option<PaymentProof>,
}

impl ResourceRequest {
    /// A request without a proof.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            payment: None,
        }
    }

    /// Attach a proof (builder style).
    pub fn with_payment(mut self, proof: PaymentProof) -> Self {
        self.payment = Some(proof);
        self
    }
}

/// A server response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// Status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Bytes,
}

impl TransportResponse {
    /// A response with no headers.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// The `Content-Type` header, if present and readable.
    pub fn content_type(&self) -> Option<String> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    /// The decoded `X-PAYMENT-RESPONSE` receipt, if present and valid.
    pub fn receipt(&self) -> Option<SettlementReceipt> {
        self.headers
            .get(HEADER_PAYMENT_RESPONSE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| SettlementReceipt::from_header(v).ok())
    }
}

/// Sends resource requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request.
    async fn send(&self, request: ResourceRequest) -> Result<TransportResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: ResourceRequest) -> Result<TransportResponse, TransportError> {
        (**self).send(request).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for &T {
    async fn send(&self, request: ResourceRequest) -> Result<TransportResponse, TransportError> {
        (**self).send(request).await
    }
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with the default timeout.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a transport with a request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ResourceRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = self.client.get(&request.url);
        if let Some(proof) = &request.payment {
            debug!(url = %request.url, proof_id = %proof.proof_id(), "Sending request with payment");
            builder = builder.header(HEADER_PAYMENT, proof.as_str());
        } else {
            debug!(url = %request.url, "Sending request");
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}
