//! Route table: the ingress webhook and a liveness probe, wrapped in the
//! usual middleware order (request id -> security headers -> trace).

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, routing::post, Router};
use ingest_infra::{request_id_middleware, security_headers_middleware};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{health::health, webhook::ingest_webhook};
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhooks/video-ingestion", post(ingest_webhook))
        .route("/health", get(health))
        .layer(ConcurrencyLimitLayer::new(1024))
        .layer(tower::timeout::TimeoutLayer::new(Duration::from_secs(60)))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .with_state(state)
}
