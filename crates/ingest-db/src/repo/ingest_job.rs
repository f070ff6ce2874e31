//! IngestJob repository: the idempotency state machine (§4.1, §9).
//!
//! The unique `(object_key, content_hash)` row is the single serialization
//! point. The fast path is an `INSERT ... ON CONFLICT DO NOTHING`: the first
//! caller to land it owns the job; every other caller (concurrent retrigger,
//! replay) observes the existing row and follows the branch rules below.

use chrono::{DateTime, Duration, Utc};
use ingest_core::{IngestJob, IngestJobStatus};
use sqlx::{PgPool, Postgres};

#[derive(Clone)]
pub struct IngestJobRepository {
    pool: PgPool,
}

/// Outcome of the idempotency check (§4.1 step 1).
#[derive(Debug, Clone, PartialEq)]
pub enum IdempotencyDecision {
    /// Proceed: the caller owns the job and should run the pipeline.
    /// `retry_count` reflects any timeout-triggered reset.
    Start { video_uid: String, retry_count: i32 },
    /// Existing row is `done`. Report already-complete; not an error.
    AlreadyDone,
    /// Existing row is `processing` within the timeout window. Report
    /// in-flight; not an error.
    InFlight,
}

impl IngestJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "ingest_jobs", object_key = %object_key))]
    pub async fn check_and_start(
        &self,
        object_key: &str,
        content_hash: &str,
        video_uid: &str,
        video_id: i64,
        processing_timeout: Duration,
    ) -> Result<IdempotencyDecision, sqlx::Error> {
        let now = Utc::now();

        let inserted = sqlx::query(
            r#"
            INSERT INTO public.ingest_jobs
                (object_key, content_hash, video_uid, video_id, status, retry_count, started_at)
            VALUES ($1, $2, $3, $4, 'processing', 0, $5)
            ON CONFLICT (object_key, content_hash) DO NOTHING
            "#,
        )
        .bind(object_key)
        .bind(content_hash)
        .bind(video_uid)
        .bind(video_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 1 {
            return Ok(IdempotencyDecision::Start {
                video_uid: video_uid.to_string(),
                retry_count: 0,
            });
        }

        // Lost the race, or a row already existed from a prior attempt.
        let row = sqlx::query_as::<Postgres, IngestJob>(
            "SELECT * FROM public.ingest_jobs WHERE object_key = $1 AND content_hash = $2",
        )
        .bind(object_key)
        .bind(content_hash)
        .fetch_one(&self.pool)
        .await?;

        match row.status {
            IngestJobStatus::Done => Ok(IdempotencyDecision::AlreadyDone),
            IngestJobStatus::Processing => {
                let started_at = row.started_at.unwrap_or(now);
                if now - started_at < processing_timeout {
                    Ok(IdempotencyDecision::InFlight)
                } else {
                    let retry_count = row.retry_count + 1;
                    self.reset_to_processing(object_key, content_hash, now, retry_count)
                        .await?;
                    Ok(IdempotencyDecision::Start {
                        video_uid: row.video_uid,
                        retry_count,
                    })
                }
            }
            IngestJobStatus::Error | IngestJobStatus::Queued => {
                self.reset_to_processing(object_key, content_hash, now, row.retry_count)
                    .await?;
                Ok(IdempotencyDecision::Start {
                    video_uid: row.video_uid,
                    retry_count: row.retry_count,
                })
            }
        }
    }

    async fn reset_to_processing(
        &self,
        object_key: &str,
        content_hash: &str,
        started_at: DateTime<Utc>,
        retry_count: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE public.ingest_jobs
            SET status = 'processing', started_at = $3, retry_count = $4, err = NULL
            WHERE object_key = $1 AND content_hash = $2
            "#,
        )
        .bind(object_key)
        .bind(content_hash)
        .bind(started_at)
        .bind(retry_count)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "ingest_jobs", object_key = %object_key))]
    pub async fn mark_done(&self, object_key: &str, content_hash: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE public.ingest_jobs SET status = 'done', finished_at = now() \
             WHERE object_key = $1 AND content_hash = $2",
        )
        .bind(object_key)
        .bind(content_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, message), fields(db.table = "ingest_jobs", object_key = %object_key))]
    pub async fn mark_error(
        &self,
        object_key: &str,
        content_hash: &str,
        message: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE public.ingest_jobs SET status = 'error', finished_at = now(), err = $3 \
             WHERE object_key = $1 AND content_hash = $2",
        )
        .bind(object_key)
        .bind(content_hash)
        .bind(message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
