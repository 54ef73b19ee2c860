//! axum routes for a guarded resource.

use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::Request;
use axum::routing::{get, MethodRouter};
use axum::Router;
use bytes::Bytes;
use http::Response;

use tollgate_facilitator::Facilitator;

use crate::guard::ResourceGuard;

/// Largest `POST` body echoed back after settlement.
pub const MAX_ECHO_BYTES: usize = 2 * 1024 * 1024;

/// A `GET`/`POST` route behind `guard`.
///
/// `GET` serves `loader`'s output. `POST` follows the same payment rules and
/// echoes the request body, which is only read once the payment settled.
pub fn paid_route<F, L, Fut, E>(guard: Arc<ResourceGuard<F>>, loader: L) -> MethodRouter
where
    F: Facilitator + 'static,
    L: Fn() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + 'static,
{
    let get_guard = Arc::clone(&guard);
    let serve = move |request: Request| {
        let guard = Arc::clone(&get_guard);
        let loader = loader.clone();
        async move {
            let (parts, _body) = request.into_parts();
            let response: Response<Bytes> = guard.handle(&parts, loader).await;
            response.map(Body::from)
        }
    };
    let echo = move |request: Request| {
        let guard = Arc::clone(&guard);
        async move {
            let (parts, body) = request.into_parts();
            let response: Response<Bytes> = guard
                .handle(&parts, || axum::body::to_bytes(body, MAX_ECHO_BYTES))
                .await;
            response.map(Body::from)
        }
    };
    get(serve).post(echo)
}

/// A router with one paid route at `path`.
pub fn router<F, L, Fut, E>(path: &str, guard: Arc<ResourceGuard<F>>, loader: L) -> Router
where
    F: Facilitator + 'static,
    L: Fn() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + 'static,
{
    Router::new().route(path, paid_route(guard, loader))
}
