//! Environment-driven configuration.
//!
//! A thin `from_env` loader that never panics, paired with `validate` so
//! that a missing or malformed key fails fast at process startup rather
//! than surfacing later as a runtime error against a half-processed video.

use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// All environment-derived settings for the ingestion worker.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub db_pool_size: u32,

    pub raw_bucket: String,
    pub hls_bucket: String,
    pub transcript_bucket: String,
    pub transcoder_template_id: String,
    pub signed_url_ttl_seconds: u64,

    pub model_name: String,
    pub lm_api_base_url: String,
    pub lm_api_key: String,
    pub lm_project_id: String,
    pub lm_region: String,
    pub cache_ttl_seconds: u64,

    pub transcoder_api_base_url: String,
    pub transcoder_api_key: String,
    pub asr_api_base_url: String,
    pub asr_api_key: String,
    pub object_store_signer_url: String,

    pub max_concurrency: usize,
    pub max_retries: u32,
    pub retry_backoff_seconds: u64,
    pub processing_timeout_seconds: i64,

    pub notifier_webhook_url: String,

    pub http_client_timeout_seconds: u64,
    pub bind_addr: String,
    pub log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Does not itself reject missing values beyond what's required to
    /// construct the struct; call [`Config::validate`] to enforce the
    /// Configuration error taxonomy (fatal at startup, no video state
    /// touched).
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL is required")?,
            db_pool_size: env_parse("DB_POOL_SIZE", 10)?,

            raw_bucket: env::var("RAW_BUCKET").unwrap_or_default(),
            hls_bucket: env::var("HLS_BUCKET").unwrap_or_default(),
            transcript_bucket: env::var("TRANSCRIPT_BUCKET").unwrap_or_default(),
            transcoder_template_id: env::var("TRANSCODER_TEMPLATE_ID").unwrap_or_default(),
            signed_url_ttl_seconds: env_parse("SIGNED_URL_TTL_SECONDS", 7200)?,

            model_name: env::var("MODEL_NAME").unwrap_or_default(),
            lm_api_base_url: env::var("LM_API_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".to_string()),
            lm_api_key: env::var("LM_API_KEY").unwrap_or_default(),
            lm_project_id: env::var("LM_PROJECT_ID").unwrap_or_default(),
            lm_region: env::var("LM_REGION").unwrap_or_default(),
            cache_ttl_seconds: env_parse("CACHE_TTL_SECONDS", 3600)?,

            transcoder_api_base_url: env::var("TRANSCODER_API_BASE_URL").unwrap_or_default(),
            transcoder_api_key: env::var("TRANSCODER_API_KEY").unwrap_or_default(),
            asr_api_base_url: env::var("ASR_API_BASE_URL").unwrap_or_default(),
            asr_api_key: env::var("ASR_API_KEY").unwrap_or_default(),
            object_store_signer_url: env::var("OBJECT_STORE_SIGNER_URL").unwrap_or_default(),

            max_concurrency: env_parse("MAX_CONCURRENCY", 20)?,
            max_retries: env_parse("MAX_RETRIES", 3)?,
            retry_backoff_seconds: env_parse("RETRY_BACKOFF_SECONDS", 1)?,
            processing_timeout_seconds: env_parse("PROCESSING_TIMEOUT_SECONDS", 3600)?,

            notifier_webhook_url: env::var("NOTIFIER_WEBHOOK_URL")
                .context("NOTIFIER_WEBHOOK_URL is required")?,

            http_client_timeout_seconds: env_parse("HTTP_CLIENT_TIMEOUT_SECONDS", 30)?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            log_format: match env::var("LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        })
    }

    /// Validate required fields and cross-field constraints.
    ///
    /// A failure here is a Configuration-taxonomy error: fatal at startup,
    /// no Video/IngestJob row is ever touched.
    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            bail!("DATABASE_URL must not be empty");
        }
        if !self.database_url.contains("://") {
            bail!("DATABASE_URL must be a SQL connection URI");
        }
        if self.notifier_webhook_url.trim().is_empty() {
            bail!("NOTIFIER_WEBHOOK_URL must not be empty");
        }
        if self.max_concurrency == 0 {
            bail!("MAX_CONCURRENCY must be at least 1");
        }
        if self.db_pool_size == 0 {
            bail!("DB_POOL_SIZE must be at least 1");
        }
        Ok(())
    }

    pub fn http_client_timeout(&self) -> Duration {
        Duration::from_secs(self.http_client_timeout_seconds)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn processing_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.processing_timeout_seconds)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid value for {key}: {e}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clear_env() {
        for key in [
            "DATABASE_URL",
            "NOTIFIER_WEBHOOK_URL",
            "MAX_CONCURRENCY",
            "DB_POOL_SIZE",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn from_env_requires_database_url() {
        clear_env();
        env::set_var("NOTIFIER_WEBHOOK_URL", "https://hooks.example.com/x");
        assert!(Config::from_env().is_err());
        clear_env();
    }

    #[test]
    fn validate_rejects_non_uri_database_url() {
        clear_env();
        let mut cfg = sample_config();
        cfg.database_url = "not-a-uri".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(sample_config().validate().is_ok());
    }

    fn sample_config() -> Config {
        Config {
            database_url: "postgres://localhost/ingest".to_string(),
            db_pool_size: 10,
            raw_bucket: "raw".to_string(),
            hls_bucket: "hls".to_string(),
            transcript_bucket: "transcripts".to_string(),
            transcoder_template_id: "default".to_string(),
            signed_url_ttl_seconds: 7200,
            model_name: "gemini-2.0".to_string(),
            lm_api_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            lm_api_key: "key".to_string(),
            lm_project_id: "proj".to_string(),
            lm_region: "us-central1".to_string(),
            cache_ttl_seconds: 3600,
            transcoder_api_base_url: "https://transcoder.internal".to_string(),
            transcoder_api_key: "key".to_string(),
            asr_api_base_url: "https://asr.internal".to_string(),
            asr_api_key: "key".to_string(),
            object_store_signer_url: "https://signer.internal".to_string(),
            max_concurrency: 20,
            max_retries: 3,
            retry_backoff_seconds: 1,
            processing_timeout_seconds: 3600,
            notifier_webhook_url: "https://hooks.example.com/x".to_string(),
            http_client_timeout_seconds: 30,
            bind_addr: "0.0.0.0:8080".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
