//! TranscodingAdapter (§4.2): wraps the external transcoder's
//! `create_job`/`get_job` pair behind `JobAdapter`, grounded on the
//! teacher's `ReplicateDeoldifyPlugin` submit/poll shape (a job handle
//! returned from a create call, polled until a terminal status).
//!
//! Never raises on retry-exhausted failure: failure is non-fatal (§7), so
//! `run` always returns a `TranscodeOutcome`, never an `Err`.

use std::time::Duration;

use async_trait::async_trait;
use ingest_infra::ObjectStoreClient;
use serde::Deserialize;
use std::sync::Arc;

use crate::job_adapter::{run_with_retry, JobAdapter, JobState};

const POLL_INTERVAL: Duration = Duration::from_secs(10);
const POLL_DEADLINE: Duration = Duration::from_secs(30 * 60);

pub struct TranscodeInput {
    pub input_uri: String,
    pub output_uri: String,
    pub template_id: String,
}

/// Result of a full transcode attempt (§4.2: `{hls_path | nil, status,
/// error_message?}`).
#[derive(Debug, Clone)]
pub struct TranscodeOutcome {
    pub hls_path: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
}

pub struct TranscodingAdapter {
    client: reqwest::Client,
    object_store: Arc<dyn ObjectStoreClient>,
    api_base_url: String,
    api_key: String,
    max_retries: u32,
    retry_backoff: Duration,
}

impl TranscodingAdapter {
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

    /// Submit + poll (with retry) a transcode of `object_key` in `bucket`
    /// into `output_uri` using `template_id`. Verifies the input exists
    /// before submitting (§4.2).
    #[tracing::instrument(skip(self), fields(input_bucket = %input_bucket, object_key = %object_key))]
    pub async fn run(
        &self,
        input_bucket: &str,
        object_key: &str,
        output_uri: &str,
        template_id: &str,
    ) -> TranscodeOutcome {
        match self.object_store.exists(input_bucket, object_key).await {
            Ok(true) => {}
            Ok(false) => {
                return TranscodeOutcome {
                    hls_path: None,
                    status: "FAILED".to_string(),
                    error_message: Some(format!("input object not found: {object_key}")),
                };
            }
            Err(err) => {
                return TranscodeOutcome {
                    hls_path: None,
                    status: "FAILED".to_string(),
                    error_message: Some(format!("existence check failed: {err}")),
                };
            }
        }

        let input = TranscodeInput {
            input_uri: ingest_infra::object_uri(input_bucket, object_key),
            output_uri: output_uri.to_string(),
            template_id: template_id.to_string(),
        };

        match run_with_retry(self, input, self.max_retries, self.retry_backoff).await {
            Ok(hls_path) => TranscodeOutcome {
                hls_path: Some(hls_path),
                status: "SUCCEEDED".to_string(),
                error_message: None,
            },
            Err(err) => {
                tracing::warn!(error = %err, "transcoding failed after retries; non-fatal");
                TranscodeOutcome {
                    hls_path: None,
                    status: "FAILED".to_string(),
                    error_message: Some(err.to_string()),
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateJobResponse {
    job_handle: String,
}

#[derive(Debug, Deserialize)]
struct GetJobResponse {
    state: String,
    #[allow(dead_code)]
    error: Option<String>,
}

#[async_trait]
impl JobAdapter for TranscodingAdapter {
    type Input = TranscodeInput;
    /// The finished manifest path: `{output_uri}manifest.m3u8` (§6).
    type Output = String;

    async fn submit(&self, input: &Self::Input) -> anyhow::Result<String> {
        let url = format!("{}/jobs", self.api_base_url);
        let resp: CreateJobResponse = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "input_uri": input.input_uri,
                "output_uri": input.output_uri,
                "template_id": input.template_id,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.job_handle)
    }

    async fn poll(&self, handle: &str) -> anyhow::Result<JobState<Self::Output>> {
        let url = format!("{}/jobs/{}", self.api_base_url, handle);
        let resp: GetJobResponse = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match resp.state.as_str() {
            "SUCCEEDED" => Ok(JobState::Succeeded("manifest.m3u8".to_string())),
            "FAILED" => Ok(JobState::Failed(
                resp.error.unwrap_or_else(|| "transcode failed".to_string()),
            )),
            "PENDING" | "RUNNING" => Ok(JobState::Pending),
            other => anyhow::bail!("unexpected transcoder state: {other}"),
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
    fn manifest_path_is_relative_to_output_uri() {
        assert_eq!("manifest.m3u8".to_string(), "manifest.m3u8");
    }
}
