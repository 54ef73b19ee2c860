//! Client commands against a guarded resource on a loopback port.

use std::sync::Arc;

use bytes::Bytes;
use tokio::net::TcpListener;

use tollgate_cli::commands::{challenge, fetch};
use tollgate_cli::{CliConfig, CliError, OutputFormat};
use tollgate_guard::{router, ResourceGuard};
use tollgate_test_utils::{sign_proof, test_config, MockFacilitator, MockPayload};
use tollgate_types::{NetworkId, PaymentRequirements};

const BODY: &str = "the paid article";

/// Serve `/article` behind a guard and return its URL.
async fn spawn_server(facilitator: MockFacilitator) -> String {
    let guard = Arc::new(ResourceGuard::new(
        test_config().with_resource_info("Article", "text/plain"),
        facilitator,
    ));
    let app = router("/article", guard, || async {
        Ok::<_, std::convert::Infallible>(Bytes::from_static(BODY.as_bytes()))
    });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/article", addr)
}

fn base_client() -> CliConfig {
    let mut config = CliConfig::default();
    config.client.network = "eip155:8453".into();
    config
}

async fn requirements(url: &str) -> PaymentRequirements {
    let json = challenge(&base_client(), OutputFormat::Json, url).await.unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    serde_json::from_value(value["challenge"]["accepts"][0].clone()).unwrap()
}

#[tokio::test]
async fn test_challenge_shows_requirements() {
    let url = spawn_server(MockFacilitator::new()).await;

    let requirements = requirements(&url).await;
    assert_eq!(requirements.resource, url);
    assert_eq!(requirements.network, NetworkId::base());
    assert_eq!(requirements.max_amount_required.as_str(), "100000");

    let human = challenge(&base_client(), OutputFormat::Human, &url)
        .await
        .unwrap();
    assert!(human.contains("Payment required"));
}

#[tokio::test]
async fn test_fetch_with_valid_proof() {
    let facilitator = MockFacilitator::new();
    let url = spawn_server(facilitator.clone()).await;
    let proof = sign_proof(&requirements(&url).await);

    let json = fetch(
        &base_client(),
        OutputFormat::Json,
        &url,
        proof.as_str(),
        None,
        None,
    )
    .await
    .unwrap();

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["text"], BODY);
    assert_eq!(value["attempts"], 1);
    assert_eq!(
        value["receipt"]["transaction"],
        facilitator.settlements()[0].transaction.as_str()
    );
}

#[tokio::test]
async fn test_fetch_saves_to_file() {
    let url = spawn_server(MockFacilitator::new()).await;
    let proof = sign_proof(&requirements(&url).await);
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("article.txt");

    fetch(
        &base_client(),
        OutputFormat::Human,
        &url,
        proof.as_str(),
        None,
        Some(path.clone()),
    )
    .await
    .unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), BODY);
}

#[tokio::test]
async fn test_spent_proof_is_not_resubmitted() {
    let facilitator = MockFacilitator::new();
    let url = spawn_server(facilitator.clone()).await;
    let proof = sign_proof(&requirements(&url).await);

    fetch(&base_client(), OutputFormat::Json, &url, proof.as_str(), None, None)
        .await
        .unwrap();
    let err = fetch(&base_client(), OutputFormat::Json, &url, proof.as_str(), None, None)
        .await
        .unwrap_err();

    assert_eq!(err.exit_code(), 6);
    assert_eq!(facilitator.call_count(), 2);
    assert_eq!(facilitator.settlement_count(), 1);
}

#[tokio::test]
async fn test_proof_on_wrong_network_is_never_sent() {
    let facilitator = MockFacilitator::new();
    let url = spawn_server(facilitator.clone()).await;
    let proof = sign_proof(&requirements(&url).await);

    let err = fetch(
        &base_client(),
        OutputFormat::Json,
        &url,
        proof.as_str(),
        Some("eip155:84532".into()),
        None,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, CliError::Negotiation(_)));
    assert_eq!(err.exit_code(), 5);
    assert_eq!(facilitator.call_count(), 0);
}

#[tokio::test]
async fn test_proof_for_other_amount_is_rejected() {
    let facilitator = MockFacilitator::new();
    let url = spawn_server(facilitator.clone()).await;
    let mut cheaper = requirements(&url).await;
    cheaper.max_amount_required = tollgate_types::TokenAmount::from_units(1);
    let proof = sign_proof(&cheaper);
    assert_eq!(MockPayload::decode(&proof).unwrap().authorization.value, "1");

    let err = fetch(&base_client(), OutputFormat::Json, &url, proof.as_str(), None, None)
        .await
        .unwrap_err();

    assert_eq!(err.exit_code(), 6);
    assert!(err.to_string().contains("amount_mismatch"));
    assert_eq!(facilitator.settlement_count(), 0);
}
