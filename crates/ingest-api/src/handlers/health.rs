//! `GET /health` (§6): liveness only — the controller's own idempotency
//! machinery is the source of truth for in-flight work, so this endpoint
//! stays a cheap constant-time check rather than probing the database.

use axum::{http::StatusCode, response::IntoResponse, Json};

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}
