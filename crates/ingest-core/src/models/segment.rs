//! Segment entity (§3).
//!
//! A time-aligned transcript slice. Uniqueness `(video_id, t_start, text)`;
//! upsert updates `t_end`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Segment {
    pub id: i64,
    pub video_id: i64,
    pub t_start: f64,
    pub t_end: f64,
    pub text: String,
    pub lang: String,
    pub meta: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// ASR output prior to persistence: one ordered slice of a transcript.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub language: Option<String>,
    pub speaker: Option<String>,
    #[serde(default)]
    pub meta: serde_json::Value,
}

impl RawSegment {
    /// Segments with empty text are dropped pre-insert (§8 boundary behavior).
    pub fn is_insertable(&self) -> bool {
        !self.text.is_empty() && self.end > self.start
    }
}

/// Parse an ASR provider's segment array, dropping any empty-text segments.
///
/// Injective over the retained subset: same count, `t_start`/`t_end`/`text`
/// preserved verbatim for everything that passes the filter (§8).
pub fn parse_segments(raw: &[RawSegment]) -> Vec<RawSegment> {
    raw.iter().filter(|s| s.is_insertable()).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str) -> RawSegment {
        RawSegment {
            start: 0.0,
            end: 3.5,
            text: text.to_string(),
            language: None,
            speaker: None,
            meta: serde_json::Value::Null,
        }
    }

    #[test]
    fn drops_empty_text_segments() {
        let input = vec![seg("hello"), seg(""), seg("world")];
        let out = parse_segments(&input);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].text, "hello");
        assert_eq!(out[1].text, "world");
    }

    #[test]
    fn preserves_timing_and_text_for_retained_segments() {
        let input = vec![seg("hello")];
        let out = parse_segments(&input);
        assert_eq!(out[0].start, input[0].start);
        assert_eq!(out[0].end, input[0].end);
        assert_eq!(out[0].text, input[0].text);
    }
}
