//! End-to-end payment flows through the resource guard.

use std::sync::Arc;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Response, StatusCode};
use serde_json::Value;
use tollgate_guard::{ResourceGuard, ServerConfig, PAYMENT_RESPONSE};
use tollgate_test_utils::{
    request_parts, request_parts_raw, sign_proof, test_config, test_guard, test_requirements,
    MockFacilitator, MockPayload, TEST_API_KEY, TEST_BODY, TEST_PATH, TEST_PAY_TO,
};
use tollgate_types::{PaymentChallenge, PaymentProof, SettlementReceipt, TokenAmount};

async fn serve(guard: &ResourceGuard<MockFacilitator>, proof: Option<&PaymentProof>) -> Response<Bytes> {
    guard
        .handle(&request_parts(TEST_PATH, proof), || async {
            Ok::<_, std::convert::Infallible>(Bytes::from_static(TEST_BODY))
        })
        .await
}

fn challenge(response: &Response<Bytes>) -> PaymentChallenge {
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    PaymentChallenge::from_json(std::str::from_utf8(response.body()).unwrap()).unwrap()
}

fn error_field(response: &Response<Bytes>) -> Option<String> {
    let body: Value = serde_json::from_slice(response.body()).unwrap();
    body.get("error").and_then(Value::as_str).map(str::to_string)
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_first_request_is_challenged() {
    let facilitator = MockFacilitator::new();
    let guard = test_guard(facilitator.clone());

    let response = serve(&guard, None).await;
    let challenge = challenge(&response);

    assert_eq!(challenge.x402_version, 1);
    assert_eq!(challenge.accepts, vec![test_requirements()]);
    assert_eq!(challenge.error, None);
    assert!(response.headers().get(&PAYMENT_RESPONSE).is_none());
    assert_eq!(facilitator.call_count(), 0);
}

#[tokio::test]
async fn test_challenge_is_idempotent() {
    let guard = test_guard(MockFacilitator::new());

    let first = serve(&guard, None).await;
    let second = serve(&guard, None).await;
    assert_eq!(
        challenge(&first).active_requirements(),
        challenge(&second).active_requirements()
    );
}

#[tokio::test]
async fn test_valid_proof_serves_resource() {
    let facilitator = MockFacilitator::new();
    let guard = test_guard(facilitator.clone());
    let proof = sign_proof(&test_requirements());

    let response = serve(&guard, Some(&proof)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "video/mp4");
    assert_eq!(response.body().as_ref(), TEST_BODY);

    let header = response.headers()[&PAYMENT_RESPONSE].to_str().unwrap();
    let receipt = SettlementReceipt::from_header(header).unwrap();
    assert!(receipt.success);
    assert_eq!(receipt.network, test_requirements().network);
    assert_eq!(receipt.transaction, facilitator.settlements()[0].transaction);
    assert_eq!(facilitator.call_count(), 1);
}

#[tokio::test]
async fn test_tampered_proof_is_rejected() {
    let facilitator = MockFacilitator::new();
    let guard = test_guard(facilitator.clone());

    let mut payload = MockPayload::decode(&sign_proof(&test_requirements())).unwrap();
    payload.authorization.value = "1".into();
    let response = serve(&guard, Some(&payload.encode())).await;

    let challenge = challenge(&response);
    assert_eq!(challenge.error.as_deref(), Some("invalid_signature"));
    assert_eq!(challenge.accepts, vec![test_requirements()]);
    assert_eq!(facilitator.settlement_count(), 0);
}

#[tokio::test]
async fn test_facilitator_outage_never_serves() {
    let facilitator = MockFacilitator::with_failure();
    let guard = test_guard(facilitator.clone());
    let proof = sign_proof(&test_requirements());

    let response = serve(&guard, Some(&proof)).await;

    assert_eq!(
        challenge(&response).error.as_deref(),
        Some("verification_unavailable")
    );
    assert!(response.headers().get(&PAYMENT_RESPONSE).is_none());

    // The proof was never judged, so it still works once the facilitator is back.
    facilitator.set_should_fail(false);
    let response = serve(&guard, Some(&proof)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_credential_is_configuration_error() {
    let config = ServerConfig::base_usdc(TEST_PAY_TO, "");
    let facilitator = MockFacilitator::new();
    let guard = ResourceGuard::new(config, facilitator.clone());

    for proof in [None, Some(sign_proof(&test_requirements()))] {
        let response = serve(&guard, proof.as_ref()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error_field(&response).as_deref(), Some("configuration_error"));
    }
    assert_eq!(facilitator.call_count(), 0);
}

// =============================================================================
// Binding and replay
// =============================================================================

#[tokio::test]
async fn test_proof_for_other_resource_is_rejected() {
    let facilitator = MockFacilitator::new();
    let guard = test_guard(facilitator.clone());

    let mut other = test_requirements();
    other.resource = "http://localhost:3000/api/cheap".into();
    let response = serve(&guard, Some(&sign_proof(&other))).await;

    assert_eq!(
        challenge(&response).error.as_deref(),
        Some("resource_mismatch")
    );
    assert_eq!(facilitator.settlement_count(), 0);
}

#[tokio::test]
async fn test_proof_for_lower_price_is_rejected() {
    let facilitator = MockFacilitator::new();
    let guard = test_guard(facilitator.clone());

    let mut cheaper = test_requirements();
    cheaper.max_amount_required = TokenAmount::from_units(1);
    let response = serve(&guard, Some(&sign_proof(&cheaper))).await;

    assert_eq!(challenge(&response).error.as_deref(), Some("amount_mismatch"));
    assert_eq!(facilitator.settlement_count(), 0);
}

#[tokio::test]
async fn test_price_change_invalidates_old_proof() {
    let facilitator = MockFacilitator::new();
    let proof = sign_proof(&test_requirements());

    let repriced = Arc::new(ResourceGuard::new(
        test_config().with_price("0.25"),
        facilitator.clone(),
    ));
    let response = serve(&repriced, Some(&proof)).await;

    let challenge = challenge(&response);
    assert_eq!(challenge.error.as_deref(), Some("amount_mismatch"));
    assert_eq!(
        challenge.active_requirements().unwrap().max_amount_required,
        TokenAmount::from_units(250_000)
    );
}

#[tokio::test]
async fn test_proof_is_settled_at_most_once() {
    let facilitator = MockFacilitator::new();
    let guard = test_guard(facilitator.clone());
    let proof = sign_proof(&test_requirements());

    let first = serve(&guard, Some(&proof)).await;
    assert_eq!(first.status(), StatusCode::OK);

    let replay = serve(&guard, Some(&proof)).await;
    assert_eq!(challenge(&replay).error.as_deref(), Some("already_settled"));
    assert_eq!(facilitator.settlement_count(), 1);
}

#[tokio::test]
async fn test_expired_proof_is_rejected() {
    let guard = test_guard(MockFacilitator::new());

    let mut payload = MockPayload::decode(&sign_proof(&test_requirements())).unwrap();
    payload.authorization.valid_before = 1;
    payload.signature = payload.authorization.digest();
    let response = serve(&guard, Some(&payload.encode())).await;

    assert_eq!(challenge(&response).error.as_deref(), Some("expired"));
}

#[tokio::test]
async fn test_unreadable_header_is_invalid_payload() {
    let facilitator = MockFacilitator::new();
    let guard = test_guard(facilitator.clone());

    let parts = request_parts_raw(TEST_PATH, Some("   "));
    let response = guard
        .handle(&parts, || async {
            Ok::<_, std::convert::Infallible>(Bytes::from_static(TEST_BODY))
        })
        .await;

    assert_eq!(challenge(&response).error.as_deref(), Some("invalid_payload"));
    assert_eq!(facilitator.call_count(), 0);
}

#[tokio::test]
async fn test_loader_failure_after_settlement_keeps_receipt() {
    let facilitator = MockFacilitator::new();
    let guard = test_guard(facilitator.clone());
    let proof = sign_proof(&test_requirements());

    let response = guard
        .handle(&request_parts(TEST_PATH, Some(&proof)), || async {
            Err::<Bytes, _>("disk gone")
        })
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_field(&response).as_deref(), Some("content_unavailable"));
    assert!(response.headers().get(&PAYMENT_RESPONSE).is_some());
    assert_eq!(facilitator.settlement_count(), 1);
}

#[test]
fn test_fixture_credential_is_set() {
    assert!(test_config().facilitator.has_credential());
    assert_eq!(test_config().facilitator.api_key.as_deref(), Some(TEST_API_KEY));
}
