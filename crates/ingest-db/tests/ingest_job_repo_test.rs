//! IngestJobRepository idempotency state machine (§4.1, §8, §9 scenarios
//! 3 and 4): the unique `(object_key, content_hash)` row is the single
//! serialization point.

mod helpers;

use chrono::Duration as ChronoDuration;
use ingest_db::{IdempotencyDecision, IngestJobRepository, VideoRepository};

#[tokio::test]
async fn replaying_the_same_event_observes_in_flight_without_starting_new_work() {
    let db = helpers::setup().await;
    let video_repo = VideoRepository::new(db.pool.clone());
    let job_repo = IngestJobRepository::new(db.pool.clone());

    let video = video_repo
        .get_or_create("video-uid-1", "uploads/v.mp4")
        .await
        .unwrap();

    let first = job_repo
        .check_and_start(
            "uploads/v.mp4",
            "abc",
            "video-uid-1",
            video.id,
            ChronoDuration::seconds(3600),
        )
        .await
        .unwrap();
    assert!(matches!(first, IdempotencyDecision::Start { retry_count: 0, .. }));

    // Same (object_key, content_hash) delivered again within the timeout.
    let second = job_repo
        .check_and_start(
            "uploads/v.mp4",
            "abc",
            "video-uid-1",
            video.id,
            ChronoDuration::seconds(3600),
        )
        .await
        .unwrap();
    assert_eq!(second, IdempotencyDecision::InFlight);

    let rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM public.ingest_jobs WHERE object_key = $1 AND content_hash = $2",
    )
    .bind("uploads/v.mp4")
    .bind("abc")
    .fetch_one(&db.pool)
    .await
    .unwrap();
    assert_eq!(rows, 1, "exactly one row per (object_key, content_hash)");
}

#[tokio::test]
async fn done_job_is_reported_already_complete() {
    let db = helpers::setup().await;
    let video_repo = VideoRepository::new(db.pool.clone());
    let job_repo = IngestJobRepository::new(db.pool.clone());

    let video = video_repo
        .get_or_create("video-uid-2", "uploads/w.mp4")
        .await
        .unwrap();

    job_repo
        .check_and_start(
            "uploads/w.mp4",
            "hash1",
            "video-uid-2",
            video.id,
            ChronoDuration::seconds(3600),
        )
        .await
        .unwrap();
    job_repo.mark_done("uploads/w.mp4", "hash1").await.unwrap();

    let decision = job_repo
        .check_and_start(
            "uploads/w.mp4",
            "hash1",
            "video-uid-2",
            video.id,
            ChronoDuration::seconds(3600),
        )
        .await
        .unwrap();
    assert_eq!(decision, IdempotencyDecision::AlreadyDone);
}

#[tokio::test]
async fn a_processing_row_past_the_timeout_is_reset_to_queued_and_retried() {
    let db = helpers::setup().await;
    let video_repo = VideoRepository::new(db.pool.clone());
    let job_repo = IngestJobRepository::new(db.pool.clone());

    let video = video_repo
        .get_or_create("video-uid-3", "uploads/x.mp4")
        .await
        .unwrap();

    job_repo
        .check_and_start(
            "uploads/x.mp4",
            "hash2",
            "video-uid-3",
            video.id,
            ChronoDuration::seconds(3600),
        )
        .await
        .unwrap();

    // Backdate started_at so it looks abandoned.
    sqlx::query(
        "UPDATE public.ingest_jobs SET started_at = now() - interval '2 hours' \
         WHERE object_key = $1 AND content_hash = $2",
    )
    .bind("uploads/x.mp4")
    .bind("hash2")
    .execute(&db.pool)
    .await
    .unwrap();

    let decision = job_repo
        .check_and_start(
            "uploads/x.mp4",
            "hash2",
            "video-uid-3",
            video.id,
            ChronoDuration::seconds(3600),
        )
        .await
        .unwrap();

    match decision {
        IdempotencyDecision::Start { retry_count, .. } => assert_eq!(retry_count, 1),
        other => panic!("expected a reset-and-restart decision, got {other:?}"),
    }
}

#[tokio::test]
async fn error_row_is_retried_without_bumping_retry_count() {
    let db = helpers::setup().await;
    let video_repo = VideoRepository::new(db.pool.clone());
    let job_repo = IngestJobRepository::new(db.pool.clone());

    let video = video_repo
        .get_or_create("video-uid-4", "uploads/y.mp4")
        .await
        .unwrap();

    job_repo
        .check_and_start(
            "uploads/y.mp4",
            "hash3",
            "video-uid-4",
            video.id,
            ChronoDuration::seconds(3600),
        )
        .await
        .unwrap();
    job_repo
        .mark_error("uploads/y.mp4", "hash3", "asr failed")
        .await
        .unwrap();

    let decision = job_repo
        .check_and_start(
            "uploads/y.mp4",
            "hash3",
            "video-uid-4",
            video.id,
            ChronoDuration::seconds(3600),
        )
        .await
        .unwrap();
    assert!(matches!(decision, IdempotencyDecision::Start { retry_count: 0, .. }));
}
