//! In-process transports for negotiator tests.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, HOST};
use http::{HeaderValue, Request, StatusCode, Uri};

use tollgate_facilitator::Facilitator;
use tollgate_guard::ResourceGuard;
use tollgate_negotiator::{ResourceRequest, Transport, TransportError, TransportResponse};
use tollgate_types::{
    ErrorCode, PaymentChallenge, PaymentRequirements, SettlementReceipt, HEADER_PAYMENT,
    HEADER_PAYMENT_RESPONSE,
};

/// Routes negotiator requests straight into a [`ResourceGuard`].
pub struct GuardTransport<F> {
    guard: Arc<ResourceGuard<F>>,
    body: Bytes,
    requests: Mutex<Vec<ResourceRequest>>,
    loads: AtomicUsize,
}

impl<F: Facilitator> GuardTransport<F> {
    /// Serve `body` behind `guard`.
    pub fn new(guard: Arc<ResourceGuard<F>>, body: impl Into<Bytes>) -> Self {
        Self {
            guard,
            body: body.into(),
            requests: Mutex::new(Vec::new()),
            loads: AtomicUsize::new(0),
        }
    }

    /// The guard requests are routed to.
    pub fn guard(&self) -> &Arc<ResourceGuard<F>> {
        &self.guard
    }

    /// Every request sent, in order.
    pub fn requests(&self) -> Vec<ResourceRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of times the resource body was loaded.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<F: Facilitator> Transport for GuardTransport<F> {
    async fn send(&self, request: ResourceRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());

        let uri: Uri = request
            .url
            .parse()
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", request.url, e)))?;
        let authority = uri
            .authority()
            .map(|a| a.to_string())
            .ok_or_else(|| TransportError::InvalidUrl(request.url.clone()))?;

        let mut builder = Request::get(uri).header(HOST, authority);
        if let Some(proof) = &request.payment {
            builder = builder.header(HEADER_PAYMENT, proof.as_str());
        }
        let (parts, ()) = builder
            .body(())
            .map_err(|e| TransportError::InvalidUrl(e.to_string()))?
            .into_parts();

        let response = self
            .guard
            .handle(&parts, || async {
                self.loads.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>(self.body.clone())
            })
            .await;

        let (head, body) = response.into_parts();
        Ok(TransportResponse {
            status: head.status,
            headers: head.headers,
            body,
        })
    }
}

/// Replays canned responses and records requests.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
    requests: Mutex<Vec<ResourceRequest>>,
}

impl ScriptedTransport {
    /// An empty script; every request fails until responses are queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response (builder style).
    pub fn then(self, response: TransportResponse) -> Self {
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    /// Queue a transport failure (builder style).
    pub fn then_error(self, error: TransportError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    /// Every request sent, in order.
    pub fn requests(&self) -> Vec<ResourceRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests sent.
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ResourceRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("script exhausted".into())))
    }
}

/// A 402 response carrying a challenge for `requirements`.
pub fn challenge_response(
    requirements: &PaymentRequirements,
    error: Option<ErrorCode>,
) -> TransportResponse {
    let challenge = PaymentChallenge::new(requirements.clone(), error);
    let mut response = TransportResponse::new(
        StatusCode::PAYMENT_REQUIRED,
        challenge.to_json().expect("challenge serializes"),
    );
    response
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// A 200 response with `body`, optionally carrying a receipt.
pub fn ok_response(
    body: impl Into<Bytes>,
    content_type: &'static str,
    receipt: Option<&SettlementReceipt>,
) -> TransportResponse {
    let mut response = TransportResponse::new(StatusCode::OK, body);
    response
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    if let Some(receipt) = receipt {
        let value = receipt.to_header().expect("receipt encodes");
        response.headers.insert(
            HEADER_PAYMENT_RESPONSE,
            HeaderValue::from_str(&value).expect("base64 is a valid header"),
        );
    }
    response
}
