//! Segment and occurrence persistence (§4.7).
//!
//! `save` opens one `TransactionGuard` and runs segment upserts then
//! occurrence inserts against the guarded connection, committing once both
//! complete. Occurrences are inserted one at a time behind a per-row
//! `SAVEPOINT` so that one bad occurrence (an unexpected constraint
//! violation that isn't the ordinary "already annotated" duplicate) is
//! tallied as skipped instead of aborting every occurrence after it. A
//! genuinely unrecoverable error (e.g. the segment insert itself failing)
//! returns before `.commit()` is reached; the guard's drop glue rolls the
//! transaction back.

use ingest_core::{Annotation, IngestError, Segment};
use sqlx::{PgPool, Row};

use crate::transaction::TransactionGuard;

#[derive(Clone)]
pub struct PersistenceRepository {
    pool: PgPool,
}

/// Wrap a `TransactionGuard` `anyhow` failure (begin/commit) as `IngestError::Database`.
fn guard_err(err: anyhow::Error) -> IngestError {
    IngestError::Database(sqlx::Error::Protocol(err.to_string()))
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct SaveSummary {
    pub segments_inserted: usize,
    pub occurrences_inserted: usize,
    pub occurrences_skipped: usize,
}

/// Postgres SQLSTATE `23503` (foreign_key_violation) — tolerated per §4.7.
fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db_err| db_err.code())
        .map(|code| code == "23503")
        .unwrap_or(false)
}

impl PersistenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, segments, annotations), fields(video_id = %video_id, segments = segments.len(), annotations = annotations.len()))]
    pub async fn save(
        &self,
        video_id: i64,
        segments: &[Segment],
        annotations: &[Annotation],
        detection_method: &str,
        ontology_ver: &str,
    ) -> Result<SaveSummary, IngestError> {
        let mut guard = TransactionGuard::begin(&self.pool).await.map_err(guard_err)?;

        let mut segment_ids = Vec::with_capacity(segments.len());
        for segment in segments {
            let row = sqlx::query(
                r#"
                INSERT INTO public.segment (video_id, t_start, t_end, text, lang, meta, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, now(), now())
                ON CONFLICT (video_id, t_start, text) DO UPDATE SET t_end = EXCLUDED.t_end, updated_at = now()
                RETURNING id
                "#,
            )
            .bind(video_id)
            .bind(segment.t_start)
            .bind(segment.t_end)
            .bind(&segment.text)
            .bind(&segment.lang)
            .bind(&segment.meta)
            .fetch_one(&mut *guard)
            .await
            .map_err(IngestError::Database)?;

            segment_ids.push(row.get::<i64, _>("id"));
        }

        let mut occurrences_inserted = 0usize;
        let mut occurrences_skipped = 0usize;
        let mut first_error: Option<sqlx::Error> = None;

        for annotation in annotations {
            let Some(&segment_id) = segment_ids.get(annotation.segment_index) else {
                occurrences_skipped += 1;
                continue;
            };

            sqlx::query("SAVEPOINT occurrence_insert")
                .execute(&mut *guard)
                .await
                .map_err(IngestError::Database)?;

            let evidence = serde_json::json!({
                "span": annotation.span,
                "rationale": annotation.rationale,
                "visual_comprehensibility": annotation.visual_comprehensibility,
                "textual_comprehensibility": annotation.textual_comprehensibility,
            });
            let reliability_score = annotation.score.unwrap_or(0.5);

            let result = sqlx::query(
                r#"
                INSERT INTO public.occurrence
                    (segment_id, fine_id, reliability_score, detection_method, ontology_ver, evidence, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, now())
                ON CONFLICT (segment_id, fine_id, ((evidence -> 'span'))) DO NOTHING
                "#,
            )
            .bind(segment_id)
            .bind(annotation.fine_id)
            .bind(reliability_score)
            .bind(detection_method)
            .bind(ontology_ver)
            .bind(&evidence)
            .execute(&mut *guard)
            .await;

            match result {
                Ok(done) if done.rows_affected() == 1 => {
                    sqlx::query("RELEASE SAVEPOINT occurrence_insert")
                        .execute(&mut *guard)
                        .await
                        .map_err(IngestError::Database)?;
                    occurrences_inserted += 1;
                }
                Ok(_) => {
                    // Conflict hit DO NOTHING: already annotated, not an error.
                    sqlx::query("RELEASE SAVEPOINT occurrence_insert")
                        .execute(&mut *guard)
                        .await
                        .map_err(IngestError::Database)?;
                    occurrences_skipped += 1;
                }
                Err(err) => {
                    sqlx::query("ROLLBACK TO SAVEPOINT occurrence_insert")
                        .execute(&mut *guard)
                        .await
                        .map_err(IngestError::Database)?;
                    occurrences_skipped += 1;

                    if is_foreign_key_violation(&err) {
                        // Tolerated: fine_id doesn't exist in the catalog (§4.7,
                        // §8 scenario 5). Not the "first failing annotation"
                        // the transaction aborts on.
                        tracing::warn!(fine_id = annotation.fine_id, "occurrence references an unknown fine_id; skipped");
                    } else if first_error.is_none() {
                        tracing::warn!(error = %err, fine_id = annotation.fine_id, "first occurrence insert error, remaining rows in this batch are tallied as skipped");
                        first_error = Some(err);
                    }
                }
            }
        }

        guard.commit().await.map_err(guard_err)?;

        if let Some(err) = first_error {
            return Err(IngestError::PersistenceFirstError(err.to_string()));
        }

        Ok(SaveSummary {
            segments_inserted: segment_ids.len(),
            occurrences_inserted,
            occurrences_skipped,
        })
    }
}
