//! Object-store signed-URL client (§6: "GETs via short-lived signed URLs;
//! PUTs likewise"; object URIs use `gs://{bucket}/{object}`).
//!
//! The object store itself is an external collaborator (§1 out-of-scope); this
//! crate only needs a thin trait so adapters can check existence and mint
//! time-limited URLs without depending on a concrete cloud SDK. The default
//! implementation talks to a signer endpoint over HTTP, grounded on the
//! teacher's `S3Service` presigned-URL methods (`generate_presigned_put_url`)
//! adapted from a direct-SDK call to an HTTP signer round trip, since this
//! crate intentionally carries no cloud-vendor SDK dependency.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

/// Operations the ingestion pipeline needs against the raw/HLS/transcript
/// buckets. Implementors are expected to be cheap to clone (e.g. an `Arc`
/// around a `reqwest::Client`).
#[async_trait]
pub trait ObjectStoreClient: Send + Sync {
    /// `true` if `gs://{bucket}/{key}` exists. Used by both adapters to
    /// verify input existence before submission (§4.2).
    async fn exists(&self, bucket: &str, key: &str) -> anyhow::Result<bool>;

    /// A short-lived signed GET URL, valid for `ttl` (§5: 300-7200s).
    async fn signed_get_url(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> anyhow::Result<String>;

    /// A short-lived signed PUT URL honoring `content_type`.
    async fn signed_put_url(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> anyhow::Result<String>;
}

/// `gs://{bucket}/{object}` URI builder (§6).
pub fn object_uri(bucket: &str, key: &str) -> String {
    format!("gs://{bucket}/{key}")
}

/// Default [`ObjectStoreClient`]: a small HTTP client over the same
/// signer service that issues upload/playback URLs elsewhere in the
/// platform. Kept deliberately thin — the object store's actual storage
/// semantics are out of this crate's scope (§1).
#[derive(Clone)]
pub struct SignerHttpObjectStore {
    client: reqwest::Client,
    signer_base_url: String,
}

impl SignerHttpObjectStore {
    pub fn new(client: reqwest::Client, signer_base_url: String) -> Self {
        Self {
            client,
            signer_base_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExistsResponse {
    exists: bool,
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    url: String,
}

#[async_trait]
impl ObjectStoreClient for SignerHttpObjectStore {
    #[tracing::instrument(skip(self), fields(bucket = %bucket, key = %key))]
    async fn exists(&self, bucket: &str, key: &str) -> anyhow::Result<bool> {
        let url = format!("{}/exists", self.signer_base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("bucket", bucket), ("key", key)])
            .send()
            .await?
            .error_for_status()?
            .json::<ExistsResponse>()
            .await?;
        Ok(resp.exists)
    }

    #[tracing::instrument(skip(self), fields(bucket = %bucket, key = %key, ttl_secs = ttl.as_secs()))]
    async fn signed_get_url(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> anyhow::Result<String> {
        let url = format!("{}/sign/get", self.signer_base_url);
        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "bucket": bucket,
                "key": key,
                "ttl_seconds": ttl.as_secs(),
            }))
            .send()
            .await?
            .error_for_status()?
            .json::<SignedUrlResponse>()
            .await?;
        Ok(resp.url)
    }

    #[tracing::instrument(skip(self), fields(bucket = %bucket, key = %key, ttl_secs = ttl.as_secs()))]
    async fn signed_put_url(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> anyhow::Result<String> {
        let url = format!("{}/sign/put", self.signer_base_url);
        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "bucket": bucket,
                "key": key,
                "content_type": content_type,
                "ttl_seconds": ttl.as_secs(),
            }))
            .send()
            .await?
            .error_for_status()?
            .json::<SignedUrlResponse>()
            .await?;
        Ok(resp.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_uri_formats_gs_scheme() {
        assert_eq!(
            object_uri("raw", "uploads/v.mp4"),
            "gs://raw/uploads/v.mp4"
        );
    }
}
