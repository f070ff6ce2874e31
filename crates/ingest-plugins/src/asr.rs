//! AsrAdapter: submits audio for transcription and polls for word-level
//! segments, following the same submit/poll shape as this codebase's other
//! external job adapters (`upload` → `start` → `poll`), collapsed here into
//! `submit`/`poll` against a single endpoint pair.

use std::time::Duration;

use async_trait::async_trait;
use ingest_core::models::RawSegment;
use ingest_infra::ObjectStoreClient;
use serde::Deserialize;
use std::sync::Arc;

use crate::job_adapter::{run_with_retry, JobAdapter, JobState};

const POLL_INTERVAL: Duration = Duration::from_secs(5);
const POLL_DEADLINE: Duration = Duration::from_secs(30 * 60);

pub struct AsrInput {
    pub audio_uri: String,
    pub language: Option<String>,
}

/// Outcome of a full ASR attempt. Failure is non-fatal at this layer; the
/// caller (IngestController) decides whether an ASR failure aborts the
/// whole ingest (§4.2, §7: `IngestError::AsrFailed`).
#[derive(Debug, Clone)]
pub struct AsrOutcome {
    pub segments: Vec<RawSegment>,
}

pub struct AsrAdapter {
    client: reqwest::Client,
    object_store: Arc<dyn ObjectStoreClient>,
    api_base_url: String,
    api_key: String,
    max_retries: u32,
    retry_backoff: Duration,
}

impl AsrAdapter {
    pub fn new(
        client: reqwest::Client,
        object_store: Arc<dyn ObjectStoreClient>,
        api_base_url: String,
        api_key: String,
        max_retries: u32,
        retry_backoff: Duration,
    ) -> Self {
        Self {
            client,
            object_store,
            api_base_url,
            api_key,
            max_retries,
            retry_backoff,
        }
    }

    /// Submit + poll (with retry) ASR over `object_key` in `bucket`.
    /// Verifies the input exists before submitting (§4.2).
    #[tracing::instrument(skip(self), fields(bucket = %bucket, object_key = %object_key))]
    pub async fn run(
        &self,
        bucket: &str,
        object_key: &str,
        language: Option<String>,
    ) -> Result<AsrOutcome, ingest_core::IngestError> {
        let exists = self
            .object_store
            .exists(bucket, object_key)
            .await
            .map_err(|err| ingest_core::IngestError::AsrFailed(format!("existence check failed: {err}")))?;

        if !exists {
            return Err(ingest_core::IngestError::AsrFailed(format!(
                "input object not found: {object_key}"
            )));
        }

        let input = AsrInput {
            audio_uri: ingest_infra::object_uri(bucket, object_key),
            language,
        };

        let segments = run_with_retry(self, input, self.max_retries, self.retry_backoff)
            .await
            .map_err(|err| ingest_core::IngestError::AsrFailed(err.to_string()))?;

        Ok(AsrOutcome { segments })
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PollResponse {
    status: String,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    segments: Vec<WireSegment>,
}

#[derive(Debug, Deserialize)]
struct WireSegment {
    start: f64,
    end: f64,
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    speaker: Option<String>,
}

impl From<WireSegment> for RawSegment {
    fn from(w: WireSegment) -> Self {
        RawSegment {
            start: w.start,
            end: w.end,
            text: w.text,
            language: w.language,
            speaker: w.speaker,
            meta: serde_json::Value::Null,
        }
    }
}

#[async_trait]
impl JobAdapter for AsrAdapter {
    type Input = AsrInput;
    type Output = Vec<RawSegment>;

    async fn submit(&self, input: &Self::Input) -> anyhow::Result<String> {
        let url = format!("{}/transcripts", self.api_base_url);
        let mut body = serde_json::json!({ "audio_url": input.audio_uri });
        if let Some(lang) = &input.language {
            body["language_code"] = serde_json::Value::String(lang.clone());
        }

        let resp: SubmitResponse = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.id)
    }

    async fn poll(&self, handle: &str) -> anyhow::Result<JobState<Self::Output>> {
        let url = format!("{}/transcripts/{}", self.api_base_url, handle);
        let resp: PollResponse = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match resp.status.as_str() {
            "completed" | "succeeded" => {
                let segments = resp.segments.into_iter().map(RawSegment::from).collect();
                Ok(JobState::Succeeded(segments))
            }
            "error" | "failed" | "canceled" => Ok(JobState::Failed(
                resp.error.unwrap_or_else(|| "asr job failed".to_string()),
            )),
            "starting" | "processing" | "queued" => Ok(JobState::Pending),
            other => anyhow::bail!("unexpected asr status: {other}"),
        }
    }

    fn poll_interval(&self) -> Duration {
        POLL_INTERVAL
    }

    fn poll_deadline(&self) -> Duration {
        POLL_DEADLINE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_segment_maps_onto_raw_segment() {
        let w = WireSegment {
            start: 1.0,
            end: 2.5,
            text: "hello".to_string(),
            language: Some("en".to_string()),
            speaker: None,
        };
        let raw: RawSegment = w.into();
        assert_eq!(raw.text, "hello");
        assert!(raw.is_insertable());
    }
}
