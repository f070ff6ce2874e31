//! IngestJob entity (§3, §4.1).
//!
//! Primary key `(object_key, content_hash)` — the single serialization point
//! for the idempotency state machine (§9).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngestJobStatus {
    Queued,
    Processing,
    Done,
    Error,
}

impl fmt::Display for IngestJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IngestJobStatus::Queued => "queued",
            IngestJobStatus::Processing => "processing",
            IngestJobStatus::Done => "done",
            IngestJobStatus::Error => "error",
        };
        write!(f, "{s}")
    }
}

impl FromStr for IngestJobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(IngestJobStatus::Queued),
            "processing" => Ok(IngestJobStatus::Processing),
            "done" => Ok(IngestJobStatus::Done),
            "error" => Ok(IngestJobStatus::Error),
            other => Err(format!("unknown ingest job status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestJob {
    pub object_key: String,
    pub content_hash: String,
    pub video_uid: String,
    pub video_id: i64,
    pub status: IngestJobStatus,
    pub retry_count: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub err: Option<String>,
}

impl FromRow<'_, PgRow> for IngestJob {
    fn from_row(row: &PgRow) -> sqlx::Result<Self> {
        let status_raw: String = row.try_get("status")?;
        let status = IngestJobStatus::from_str(&status_raw).map_err(|e| sqlx::Error::ColumnDecode {
            index: "status".to_string(),
            source: e.into(),
        })?;

        Ok(IngestJob {
            object_key: row.try_get("object_key")?,
            content_hash: row.try_get("content_hash")?,
            video_uid: row.try_get("video_uid")?,
            video_id: row.try_get("video_id")?,
            status,
            retry_count: row.try_get("retry_count")?,
            started_at: row.try_get("started_at")?,
            finished_at: row.try_get("finished_at")?,
            err: row.try_get("err")?,
        })
    }
}

/// Decoded ingress event (§6): `(bucket, object_key, content_hash, generation, event_time)`.
#[derive(Debug, Clone, Deserialize)]
pub struct IngressEvent {
    pub bucket: String,
    #[serde(rename = "name")]
    pub object_key: String,
    #[serde(rename = "etag")]
    pub content_hash: String,
    pub generation: Option<String>,
    #[serde(rename = "timeCreated")]
    pub event_time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr as _;

    #[test]
    fn status_round_trips() {
        for status in [
            IngestJobStatus::Queued,
            IngestJobStatus::Processing,
            IngestJobStatus::Done,
            IngestJobStatus::Error,
        ] {
            assert_eq!(
                IngestJobStatus::from_str(&status.to_string()).unwrap(),
                status
            );
        }
    }

    #[test]
    fn ingress_event_decodes_expected_shape() {
        let raw = r#"{
            "bucket": "raw",
            "name": "uploads/v.mp4",
            "etag": "abc",
            "generation": "1",
            "timeCreated": "2026-01-01T00:00:00Z"
        }"#;
        let event: IngressEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.bucket, "raw");
        assert_eq!(event.object_key, "uploads/v.mp4");
        assert_eq!(event.content_hash, "abc");
    }
}
