//! NotifierGateway (§4.8): structured card dispatch for tool-lookup misses
//! and fatal errors, delivered over a webhook client guarded by
//! `webhook::ssrf::validate_url_for_ssrf`.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::webhook::ssrf::validate_url_for_ssrf;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Success,
}

#[derive(Debug, Clone, Serialize)]
pub struct Card {
    pub severity: Severity,
    pub title: String,
    pub content: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl Card {
    fn new(severity: Severity, title: impl Into<String>, content: BTreeMap<String, String>) -> Self {
        Self {
            severity,
            title: title.into(),
            content,
            metadata: None,
            timestamp: Utc::now(),
        }
    }
}

/// Dispatches structured alert cards to the configured notifier webhook.
/// Delivery failures are logged and swallowed (§4.8, §7: "Notifier failure:
/// logged, swallowed").
#[derive(Clone)]
pub struct NotifierGateway {
    client: reqwest::Client,
    webhook_url: String,
}

impl NotifierGateway {
    pub fn new(client: reqwest::Client, webhook_url: String) -> Self {
        Self {
            client,
            webhook_url,
        }
    }

    pub fn with_timeout(webhook_url: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::new(client, webhook_url))
    }

    /// Phrase-not-found: warning severity (§4.5, §4.8).
    #[tracing::instrument(skip(self))]
    pub async fn notify_phrase_not_found(&self, lemma: &str, segment_index: usize, video_uid: &str) {
        let mut content = BTreeMap::new();
        content.insert("lemma".to_string(), lemma.to_string());
        content.insert("segment_index".to_string(), segment_index.to_string());
        content.insert("video_uid".to_string(), video_uid.to_string());
        self.notify(Card::new(Severity::Warning, "phrase not found in catalog", content))
            .await;
    }

    /// Word-not-found: info severity (§4.5, §4.8).
    #[tracing::instrument(skip(self))]
    pub async fn notify_word_not_found(&self, lemma: &str, segment_index: usize, video_uid: &str) {
        let mut content = BTreeMap::new();
        content.insert("lemma".to_string(), lemma.to_string());
        content.insert("segment_index".to_string(), segment_index.to_string());
        content.insert("video_uid".to_string(), video_uid.to_string());
        self.notify(Card::new(Severity::Info, "word not found in catalog", content))
            .await;
    }

    /// Fatal-error: error severity, dispatched from IngestController on any
    /// typed failure that marks Video/IngestJob as `error` (§4.1 step 6).
    #[tracing::instrument(skip(self, message))]
    pub async fn notify_fatal_error(&self, stage: &str, video_uid: &str, message: &str) {
        let mut content = BTreeMap::new();
        content.insert("stage".to_string(), stage.to_string());
        content.insert("video_uid".to_string(), video_uid.to_string());
        content.insert("message".to_string(), message.to_string());
        self.notify(Card::new(Severity::Error, "ingestion failed", content))
            .await;
    }

    /// Low-level dispatch: POST the card, log and swallow on any failure.
    #[tracing::instrument(skip(self, card), fields(title = %card.title))]
    pub async fn notify(&self, card: Card) {
        if let Err(reason) = validate_url_for_ssrf(&self.webhook_url, false, None).await {
            tracing::warn!(%reason, "notifier webhook url failed SSRF validation; not dispatching");
            return;
        }

        match self.client.post(&self.webhook_url).json(&card).send().await {
            Ok(resp) if resp.status().is_success() => {}
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), "notifier webhook returned non-success status");
            }
            Err(err) => {
                tracing::warn!(error = %err, "notifier webhook dispatch failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_carries_server_generated_timestamp() {
        let card = Card::new(Severity::Info, "test", BTreeMap::new());
        assert!(card.timestamp <= Utc::now());
    }
}
