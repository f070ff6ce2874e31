//! IngestController (§4.1): the ingestion state machine. Parses an ingress
//! event, enforces idempotency, fans out the transcoding/ASR adapters,
//! drives annotation, persists, and finalizes Video/IngestJob state.

use std::sync::Arc;

use chrono::Utc;
use ingest_core::{
    derive_video_uid, parse_segments, Config, IngestError, IngressEvent, Segment, VideoStatus,
};
use ingest_db::{IdempotencyDecision, IngestJobRepository, PersistenceRepository, VideoRepository};
use ingest_infra::{object_uri, ObjectStoreClient};
use ingest_plugins::{AsrAdapter, TranscodingAdapter};
use ingest_services::{AnnotationOrchestrator, NotifierGateway};

/// Outcome of one `process` call, used for logging by the caller (the
/// webhook handler spawns `process` and never waits on this return value
/// directly — see §4.1's "entrypoint shape").
#[derive(Debug)]
pub enum IngestOutcome {
    Done(PipelineSummary),
    AlreadyDone,
    InFlight,
}

/// Result of steps 2-5 of §4.1, kept for the caller's logging only.
#[derive(Debug)]
pub struct PipelineSummary {
    pub segments_inserted: usize,
    pub occurrences_inserted: usize,
    pub occurrences_skipped: usize,
    pub hls_path: Option<String>,
}

pub struct IngestController {
    config: Config,
    video_repo: VideoRepository,
    ingest_job_repo: IngestJobRepository,
    persistence_repo: PersistenceRepository,
    transcoding: TranscodingAdapter,
    asr: AsrAdapter,
    orchestrator: AnnotationOrchestrator,
    notifier: NotifierGateway,
    #[allow(dead_code)]
    object_store: Arc<dyn ObjectStoreClient>,
}

impl IngestController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        video_repo: VideoRepository,
        ingest_job_repo: IngestJobRepository,
        persistence_repo: PersistenceRepository,
        transcoding: TranscodingAdapter,
        asr: AsrAdapter,
        orchestrator: AnnotationOrchestrator,
        notifier: NotifierGateway,
        object_store: Arc<dyn ObjectStoreClient>,
    ) -> Self {
        Self {
            config,
            video_repo,
            ingest_job_repo,
            persistence_repo,
            transcoding,
            asr,
            orchestrator,
            notifier,
            object_store,
        }
    }

    /// Run the full state machine for one ingress event (§4.1).
    #[tracing::instrument(skip(self, event), fields(object_key = %event.object_key, content_hash = %event.content_hash))]
    pub async fn process(&self, event: IngressEvent) -> Result<IngestOutcome, IngestError> {
        let video_uid = derive_video_uid(&event.object_key);
        let video = self
            .video_repo
            .get_or_create(&video_uid, &event.object_key)
            .await?;

        let decision = self
            .ingest_job_repo
            .check_and_start(
                &event.object_key,
                &event.content_hash,
                &video_uid,
                video.id,
                self.config.processing_timeout(),
            )
            .await
            .map_err(IngestError::Database)?;

        let retry_count = match decision {
            IdempotencyDecision::AlreadyDone => {
                tracing::info!(video_uid = %video_uid, "ingest job already done; skipping");
                return Ok(IngestOutcome::AlreadyDone);
            }
            IdempotencyDecision::InFlight => {
                tracing::info!(video_uid = %video_uid, "ingest job already in flight; skipping");
                return Ok(IngestOutcome::InFlight);
            }
            IdempotencyDecision::Start { retry_count, .. } => retry_count,
        };

        tracing::info!(video_uid = %video_uid, retry_count, "starting ingest pipeline");

        match self.run_pipeline(&event, &video_uid, video.id).await {
            Ok(outcome) => {
                self.ingest_job_repo
                    .mark_done(&event.object_key, &event.content_hash)
                    .await
                    .map_err(IngestError::Database)?;
                Ok(IngestOutcome::Done(outcome))
            }
            Err(err) => {
                let _ = self
                    .ingest_job_repo
                    .mark_error(&event.object_key, &event.content_hash, &err.to_string())
                    .await;
                let _ = self
                    .video_repo
                    .update_status(video.id, VideoStatus::Error, None, None)
                    .await;
                self.notifier
                    .notify_fatal_error("ingest", &video_uid, &err.to_string())
                    .await;
                Err(err)
            }
        }
    }

    /// Steps 2-5 of §4.1: fan out, annotate, persist, finalize.
    async fn run_pipeline(
        &self,
        event: &IngressEvent,
        video_uid: &str,
        video_id: i64,
    ) -> Result<PipelineSummary, IngestError> {
        let output_uri = object_uri(&self.config.hls_bucket, &format!("{video_uid}/"));

        let (transcode_outcome, asr_outcome) = tokio::join!(
            self.transcoding.run(
                &event.bucket,
                &event.object_key,
                &output_uri,
                &self.config.transcoder_template_id,
            ),
            self.asr.run(&event.bucket, &event.object_key, None),
        );

        let asr_outcome = asr_outcome?;
        let raw_segments = parse_segments(&asr_outcome.segments);

        let now = Utc::now();
        let segments: Vec<Segment> = raw_segments
            .iter()
            .map(|raw| Segment {
                id: 0,
                video_id,
                t_start: raw.start,
                t_end: raw.end,
                text: raw.text.clone(),
                lang: raw.language.clone().unwrap_or_else(|| "en".to_string()),
                meta: raw.meta.clone(),
                created_at: now,
                updated_at: now,
            })
            .collect();

        let video_uri = object_uri(&event.bucket, &event.object_key);
        let annotation_result = self
            .orchestrator
            .run(video_uid, Some(&video_uri), &segments)
            .await;

        let summary = self
            .persistence_repo
            .save(
                video_id,
                &segments,
                &annotation_result.annotations,
                &annotation_result.method.to_string(),
                &annotation_result.ontology_ver,
            )
            .await?;

        tracing::info!(
            video_uid = %video_uid,
            segments_inserted = summary.segments_inserted,
            occurrences_inserted = summary.occurrences_inserted,
            occurrences_skipped = summary.occurrences_skipped,
            method = %annotation_result.method,
            "persistence complete"
        );

        let hls_path = transcode_outcome
            .hls_path
            .as_ref()
            .map(|manifest| format!("{output_uri}{manifest}"));
        let transcript_path = object_uri(
            &self.config.transcript_bucket,
            &format!("{video_uid}/transcript.json"),
        );

        self.video_repo
            .update_status(
                video_id,
                VideoStatus::Ready,
                hls_path.as_deref(),
                Some(transcript_path.as_str()),
            )
            .await?;

        Ok(PipelineSummary {
            segments_inserted: summary.segments_inserted,
            occurrences_inserted: summary.occurrences_inserted,
            occurrences_skipped: summary.occurrences_skipped,
            hls_path,
        })
    }
}
