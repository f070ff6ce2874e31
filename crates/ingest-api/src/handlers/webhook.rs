//! `POST /webhooks/video-ingestion` (§6): decodes the Pub/Sub-shaped
//! ingress envelope, hands the event to `IngestController` on a detached
//! task, and replies before the pipeline runs — §6: "Processing proceeds
//! asynchronously after the 200."

use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::StatusCode, response::IntoResponse, Json};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ingest_core::{derive_video_uid, IngressEvent};
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct PubSubEnvelope {
    message: PubSubMessage,
}

#[derive(Debug, Deserialize)]
struct PubSubMessage {
    data: String,
    #[serde(default)]
    #[allow(dead_code)]
    message_id: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    publish_time: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    attributes: Option<serde_json::Value>,
}

fn malformed(details: impl Into<String>) -> axum::response::Response {
    let body = crate::error::ErrorResponse {
        error: "malformed ingress event".to_string(),
        details: Some(details.into()),
        code: "MALFORMED_INGRESS_EVENT".to_string(),
        recoverable: false,
    };
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

/// Decode a raw HTTP body into an `IngressEvent`: outer envelope JSON,
/// base64 `message.data`, inner event JSON. Pulled out of the handler so
/// the three failure modes can be exercised without a live `AppState`.
fn decode_ingress_event(body: &[u8]) -> Result<IngressEvent, String> {
    let envelope: PubSubEnvelope =
        serde_json::from_slice(body).map_err(|err| format!("invalid envelope: {err}"))?;

    let decoded = STANDARD
        .decode(envelope.message.data.as_bytes())
        .map_err(|err| format!("invalid base64 payload: {err}"))?;

    serde_json::from_slice(&decoded).map_err(|err| format!("invalid ingress payload: {err}"))
}

pub async fn ingest_webhook(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> axum::response::Response {
    let event = match decode_ingress_event(&body) {
        Ok(event) => event,
        Err(reason) => return malformed(reason),
    };

    let video_uid = derive_video_uid(&event.object_key);

    tracing::info!(
        video_uid = %video_uid,
        object_key = %event.object_key,
        bucket = %event.bucket,
        "accepted ingress event"
    );

    let controller = state.controller.clone();
    let spawned_video_uid = video_uid.clone();
    tokio::spawn(async move {
        match controller.process(event).await {
            Ok(outcome) => {
                tracing::info!(video_uid = %spawned_video_uid, outcome = ?outcome, "ingest pipeline finished");
            }
            Err(err) => {
                tracing::error!(video_uid = %spawned_video_uid, error = %err, "ingest pipeline failed");
            }
        }
    });

    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "accepted", "video_uid": video_uid })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(data_b64: &str) -> Vec<u8> {
        serde_json::json!({
            "message": {
                "data": data_b64,
                "messageId": "1",
                "publishTime": "2026-01-01T00:00:00Z",
            }
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn decodes_a_well_formed_envelope() {
        let inner = serde_json::json!({
            "bucket": "raw",
            "name": "uploads/v.mp4",
            "etag": "abc",
            "timeCreated": "2026-01-01T00:00:00Z",
        })
        .to_string();
        let data_b64 = STANDARD.encode(inner.as_bytes());

        let event = decode_ingress_event(&envelope(&data_b64)).unwrap();
        assert_eq!(event.bucket, "raw");
        assert_eq!(event.object_key, "uploads/v.mp4");
        assert_eq!(event.content_hash, "abc");
    }

    #[test]
    fn rejects_envelope_that_is_not_json() {
        let err = decode_ingress_event(b"not json at all").unwrap_err();
        assert!(err.contains("invalid envelope"));
    }

    #[test]
    fn rejects_non_base64_data() {
        let err = decode_ingress_event(&envelope("not-valid-base64!!")).unwrap_err();
        assert!(err.contains("invalid base64 payload"));
    }

    #[test]
    fn rejects_decoded_payload_missing_required_fields() {
        let inner = serde_json::json!({ "bucket": "raw" }).to_string();
        let data_b64 = STANDARD.encode(inner.as_bytes());
        let err = decode_ingress_event(&envelope(&data_b64)).unwrap_err();
        assert!(err.contains("invalid ingress payload"));
    }
}
