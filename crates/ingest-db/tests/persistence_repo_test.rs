//! PersistenceRepository (§4.7, §8 scenario 5): segment upsert and
//! foreign-key-tolerant occurrence insert.

mod helpers;

use chrono::Utc;
use ingest_core::{Annotation, Segment, Span};
use ingest_db::{PersistenceRepository, VideoRepository};

fn segment(video_id: i64, t_start: f64, text: &str) -> Segment {
    let now = Utc::now();
    Segment {
        id: 0,
        video_id,
        t_start,
        t_end: t_start + 3.5,
        text: text.to_string(),
        lang: "en".to_string(),
        meta: serde_json::Value::Null,
        created_at: now,
        updated_at: now,
    }
}

fn annotation(segment_index: usize, fine_id: i64, start: i64, end: i64) -> Annotation {
    Annotation {
        segment_index,
        fine_id,
        span: Span { start, end },
        rationale: "because".to_string(),
        visual_comprehensibility: 0.85,
        textual_comprehensibility: 0.7,
        score: None,
    }
}

async fn insert_active_fine_unit(pool: &sqlx::PgPool, label: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO semantic.fine_unit (kind, label, lang, pos, def, status) \
         VALUES ('phrase_sense', $1, 'en', NULL, 'a test sense', 'active') RETURNING id",
    )
    .bind(label)
    .fetch_one(pool)
    .await
    .unwrap()
}

#[tokio::test]
async fn happy_path_inserts_one_segment_and_one_occurrence() {
    let db = helpers::setup().await;
    let video_repo = VideoRepository::new(db.pool.clone());
    let persistence = PersistenceRepository::new(db.pool.clone());

    let video = video_repo
        .get_or_create("video-uid-happy", "uploads/v.mp4")
        .await
        .unwrap();
    let fine_id = insert_active_fine_unit(&db.pool, "give up").await;

    let segments = vec![segment(
        video.id,
        0.0,
        "I want to give up learning English",
    )];
    let annotations = vec![annotation(0, fine_id, 10, 17)];

    let summary = persistence
        .save(video.id, &segments, &annotations, "model_video", "gemini-2.0")
        .await
        .unwrap();

    assert_eq!(summary.segments_inserted, 1);
    assert_eq!(summary.occurrences_inserted, 1);
    assert_eq!(summary.occurrences_skipped, 0);
}

#[tokio::test]
async fn replaying_the_same_segment_upserts_rather_than_duplicating() {
    let db = helpers::setup().await;
    let video_repo = VideoRepository::new(db.pool.clone());
    let persistence = PersistenceRepository::new(db.pool.clone());

    let video = video_repo
        .get_or_create("video-uid-upsert", "uploads/v.mp4")
        .await
        .unwrap();

    let mut seg = segment(video.id, 0.0, "hello world");
    persistence
        .save(video.id, std::slice::from_ref(&seg), &[], "model_text", "gemini-2.0")
        .await
        .unwrap();

    // Same (video_id, t_start, text) but a later t_end.
    seg.t_end = 9.9;
    persistence
        .save(video.id, std::slice::from_ref(&seg), &[], "model_text", "gemini-2.0")
        .await
        .unwrap();

    let rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM public.segment WHERE video_id = $1 AND t_start = 0.0 AND text = 'hello world'",
    )
    .bind(video.id)
    .fetch_one(&db.pool)
    .await
    .unwrap();
    assert_eq!(rows, 1, "upsert must not create a second row");

    let t_end: f64 = sqlx::query_scalar(
        "SELECT t_end FROM public.segment WHERE video_id = $1 AND t_start = 0.0 AND text = 'hello world'",
    )
    .bind(video.id)
    .fetch_one(&db.pool)
    .await
    .unwrap();
    assert_eq!(t_end, 9.9);
}

#[tokio::test]
async fn occurrence_referencing_an_unknown_fine_id_is_skipped_not_raised() {
    let db = helpers::setup().await;
    let video_repo = VideoRepository::new(db.pool.clone());
    let persistence = PersistenceRepository::new(db.pool.clone());

    let video = video_repo
        .get_or_create("video-uid-fk", "uploads/v.mp4")
        .await
        .unwrap();
    let valid_fine_id = insert_active_fine_unit(&db.pool, "learn").await;

    let segments = vec![segment(video.id, 0.0, "I want to learn English")];
    let annotations = vec![
        annotation(0, 999_999, 10, 15),
        annotation(0, valid_fine_id, 16, 23),
    ];

    let summary = persistence
        .save(video.id, &segments, &annotations, "model_video", "gemini-2.0")
        .await
        .unwrap();

    assert_eq!(summary.occurrences_inserted, 1);
    assert_eq!(summary.occurrences_skipped, 1);
}

#[tokio::test]
async fn duplicate_span_for_the_same_fine_unit_is_dropped_silently() {
    let db = helpers::setup().await;
    let video_repo = VideoRepository::new(db.pool.clone());
    let persistence = PersistenceRepository::new(db.pool.clone());

    let video = video_repo
        .get_or_create("video-uid-dup", "uploads/v.mp4")
        .await
        .unwrap();
    let fine_id = insert_active_fine_unit(&db.pool, "give up").await;

    let segments = vec![segment(video.id, 0.0, "I want to give up learning English")];
    let annotations = vec![annotation(0, fine_id, 10, 17), annotation(0, fine_id, 10, 17)];

    let summary = persistence
        .save(video.id, &segments, &annotations, "model_video", "gemini-2.0")
        .await
        .unwrap();

    assert_eq!(summary.occurrences_inserted, 1);
    assert_eq!(summary.occurrences_skipped, 1);
}

#[tokio::test]
async fn out_of_range_segment_index_is_skipped() {
    let db = helpers::setup().await;
    let video_repo = VideoRepository::new(db.pool.clone());
    let persistence = PersistenceRepository::new(db.pool.clone());

    let video = video_repo
        .get_or_create("video-uid-oob", "uploads/v.mp4")
        .await
        .unwrap();
    let fine_id = insert_active_fine_unit(&db.pool, "give up").await;

    let segments = vec![segment(video.id, 0.0, "one segment only")];
    let annotations = vec![annotation(5, fine_id, 0, 3)];

    let summary = persistence
        .save(video.id, &segments, &annotations, "model_video", "gemini-2.0")
        .await
        .unwrap();

    assert_eq!(summary.occurrences_inserted, 0);
    assert_eq!(summary.occurrences_skipped, 1);
}
