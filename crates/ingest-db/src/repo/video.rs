//! Video repository (§3, §4.1).
//!
//! IngestController exclusively creates/advances Video rows.

use chrono::Utc;
use ingest_core::{IngestError, Video, VideoStatus};
use sqlx::{PgPool, Postgres};

#[derive(Clone)]
pub struct VideoRepository {
    pool: PgPool,
}

impl VideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Return the existing row for `video_uid`, or create one with
    /// `status=PROCESSING` on first sighting.
    #[tracing::instrument(skip(self), fields(db.table = "video", video_uid = %video_uid))]
    pub async fn get_or_create(
        &self,
        video_uid: &str,
        storage_path: &str,
    ) -> Result<Video, IngestError> {
        if let Some(existing) = sqlx::query_as::<Postgres, Video>(
            "SELECT * FROM public.video WHERE video_uid = $1",
        )
        .bind(video_uid)
        .fetch_optional(&self.pool)
        .await?
        {
            return Ok(existing);
        }

        let now = Utc::now();
        let video = sqlx::query_as::<Postgres, Video>(
            r#"
            INSERT INTO public.video (video_uid, status, storage_path, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT (video_uid) DO UPDATE SET updated_at = EXCLUDED.updated_at
            RETURNING *
            "#,
        )
        .bind(video_uid)
        .bind(VideoStatus::Processing.to_string())
        .bind(storage_path)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(video)
    }

    /// Finalize a video's status, optionally recording `hls_path` /
    /// `structured_transcript_path`. Never moves status backward — callers
    /// only invoke this from the controller's finalize/error paths.
    #[tracing::instrument(skip(self), fields(db.table = "video", video_id = %video_id))]
    pub async fn update_status(
        &self,
        video_id: i64,
        status: VideoStatus,
        hls_path: Option<&str>,
        transcript_path: Option<&str>,
    ) -> Result<(), IngestError> {
        sqlx::query(
            r#"
            UPDATE public.video
            SET status = $2,
                hls_path = COALESCE($3, hls_path),
                structured_transcript_path = COALESCE($4, structured_transcript_path),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(video_id)
        .bind(status.to_string())
        .bind(hls_path)
        .bind(transcript_path)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
