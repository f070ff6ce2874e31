//! Video entity (§3).
//!
//! Lifecycle: created on first ingress for a `video_uid` with
//! `status=PROCESSING`. Advances PROCESSING -> READY on successful finalize,
//! PROCESSING -> ERROR on fatal failure. Never goes backward.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoStatus {
    Processing,
    Ready,
    Error,
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VideoStatus::Processing => "PROCESSING",
            VideoStatus::Ready => "READY",
            VideoStatus::Error => "ERROR",
        };
        write!(f, "{s}")
    }
}

impl FromStr for VideoStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PROCESSING" => Ok(VideoStatus::Processing),
            "READY" => Ok(VideoStatus::Ready),
            "ERROR" => Ok(VideoStatus::Error),
            other => Err(format!("unknown video status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: i64,
    pub video_uid: String,
    pub status: VideoStatus,
    pub storage_path: String,
    pub hls_path: Option<String>,
    pub structured_transcript_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FromRow<'_, PgRow> for Video {
    fn from_row(row: &PgRow) -> sqlx::Result<Self> {
        let status_raw: String = row.try_get("status")?;
        let status = VideoStatus::from_str(&status_raw)
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "status".to_string(),
                source: e.into(),
            })?;

        Ok(Video {
            id: row.try_get("id")?,
            video_uid: row.try_get("video_uid")?,
            status,
            storage_path: row.try_get("storage_path")?,
            hls_path: row.try_get("hls_path")?,
            structured_transcript_path: row.try_get("structured_transcript_path")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Derive a stable `video_uid` from an ingress object key (§3).
///
/// If the key carries a valid UUID token, it's used verbatim; otherwise a
/// deterministic UUID5 is derived over the key so the same key always maps
/// to the same `video_uid` (§8: `derive_video_uid` is deterministic).
pub fn derive_video_uid(object_key: &str) -> String {
    for token in object_key.split(|c: char| !c.is_ascii_alphanumeric() && c != '-') {
        if let Ok(uuid) = Uuid::parse_str(token) {
            return uuid.to_string();
        }
    }
    Uuid::new_v5(&Uuid::NAMESPACE_URL, object_key.as_bytes()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_video_uid_extracts_embedded_uuid() {
        let key = "uploads/6f8e2f2a-1c2d-4e3f-9a1b-5d6c7e8f9a0b/v.mp4";
        assert_eq!(
            derive_video_uid(key),
            "6f8e2f2a-1c2d-4e3f-9a1b-5d6c7e8f9a0b"
        );
    }

    #[test]
    fn derive_video_uid_is_deterministic_without_embedded_uuid() {
        let key = "uploads/my-video.mp4";
        assert_eq!(derive_video_uid(key), derive_video_uid(key));
    }

    #[test]
    fn derive_video_uid_differs_for_different_keys() {
        assert_ne!(
            derive_video_uid("uploads/a.mp4"),
            derive_video_uid("uploads/b.mp4")
        );
    }

    #[test]
    fn status_round_trips_through_display_and_from_str() {
        for status in [VideoStatus::Processing, VideoStatus::Ready, VideoStatus::Error] {
            let rendered = status.to_string();
            assert_eq!(VideoStatus::from_str(&rendered).unwrap(), status);
        }
    }
}
