//! Shared fixtures.

use std::sync::Arc;

use http::header::HOST;
use http::request::Parts;
use http::Request;
use serde_json::{Map, Value};

use tollgate_guard::{ResourceGuard, ServerConfig};
use tollgate_types::{
    NetworkId, PaymentProof, PaymentRequirements, Scheme, TokenAmount, HEADER_PAYMENT, USDC_BASE,
};

use crate::mock_facilitator::MockFacilitator;

/// Recipient used by every fixture.
pub const TEST_PAY_TO: &str = "0x209693Bc6afc0C5328bA36FaF03C514EF312287C";

/// Facilitator credential used by every fixture.
pub const TEST_API_KEY: &str = "test-facilitator-key";

/// Host of the fixture server.
pub const TEST_HOST: &str = "localhost:3000";

/// Path of the paid fixture resource.
pub const TEST_PATH: &str = "/api/video";

/// Canonical URL of the paid fixture resource.
pub const TEST_RESOURCE_URL: &str = "http://localhost:3000/api/video";

/// Body of the paid fixture resource.
pub const TEST_BODY: &[u8] = b"\x00\x00\x00\x18ftypmp42 premium video";

/// A valid configuration: USDC on Base, 0.10 per request, `video/mp4`.
pub fn test_config() -> ServerConfig {
    ServerConfig::base_usdc(TEST_PAY_TO, TEST_API_KEY)
        .with_resource_info("Premium video", "video/mp4")
        .with_public_scheme("http")
}

/// The requirements a guard built from [`test_config`] issues for
/// [`TEST_RESOURCE_URL`].
pub fn test_requirements() -> PaymentRequirements {
    let mut extra = Map::new();
    extra.insert("name".into(), Value::String("USD Coin".into()));
    extra.insert("version".into(), Value::String("2".into()));

    PaymentRequirements {
        scheme: Scheme::Exact,
        network: NetworkId::base(),
        max_amount_required: TokenAmount::from_units(100_000),
        resource: TEST_RESOURCE_URL.to_string(),
        description: "Premium video".to_string(),
        mime_type: "video/mp4".to_string(),
        pay_to: TEST_PAY_TO.to_string(),
        max_timeout_seconds: 60,
        asset: USDC_BASE.to_string(),
        extra: Some(extra),
    }
}

/// A guard over [`test_config`] backed by `facilitator`.
pub fn test_guard(facilitator: MockFacilitator) -> Arc<ResourceGuard<MockFacilitator>> {
    Arc::new(ResourceGuard::new(test_config(), facilitator))
}

/// Request head for `path` on [`TEST_HOST`], optionally carrying a proof.
pub fn request_parts(path: &str, proof: Option<&PaymentProof>) -> Parts {
    request_parts_raw(path, proof.map(PaymentProof::as_str))
}

/// Request head with an arbitrary `X-PAYMENT` value.
pub fn request_parts_raw(path: &str, payment: Option<&str>) -> Parts {
    let mut builder = Request::get(path).header(HOST, TEST_HOST);
    if let Some(payment) = payment {
        builder = builder.header(HEADER_PAYMENT, payment);
    }
    let (parts, ()) = builder.body(()).expect("valid request").into_parts();
    parts
}
