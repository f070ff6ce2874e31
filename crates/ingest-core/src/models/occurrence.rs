//! Occurrence entity (§3).
//!
//! Binds a Segment to a FineUnit with evidence. Uniqueness
//! `(segment_id, fine_id, evidence.span)`; conflicts are silently dropped.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionMethod {
    ModelVideo,
    ModelText,
    ModelNocache,
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DetectionMethod::ModelVideo => "model_video",
            DetectionMethod::ModelText => "model_text",
            DetectionMethod::ModelNocache => "model_nocache",
        };
        write!(f, "{s}")
    }
}

impl FromStr for DetectionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "model_video" => Ok(DetectionMethod::ModelVideo),
            "model_text" => Ok(DetectionMethod::ModelText),
            "model_nocache" => Ok(DetectionMethod::ModelNocache),
            other => Err(format!("unknown detection method: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Span {
    pub start: i64,
    pub end: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub span: Span,
    pub rationale: String,
    pub visual_comprehensibility: f64,
    pub textual_comprehensibility: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Occurrence {
    pub id: i64,
    pub segment_id: i64,
    pub fine_id: i64,
    pub reliability_score: f64,
    pub detection_method: DetectionMethod,
    pub ontology_ver: String,
    pub evidence: Evidence,
    pub created_at: DateTime<Utc>,
}

/// One annotation emitted by an `Annotator` before it is bound to a concrete
/// `segment_id` by Persistence. `segment_index` is resolved against the
/// vector of segment ids returned by the segment insert pass (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub segment_index: usize,
    pub fine_id: i64,
    pub span: Span,
    pub rationale: String,
    pub visual_comprehensibility: f64,
    pub textual_comprehensibility: f64,
    /// Optional LM-supplied reliability score; defaults to 0.5 when absent
    /// (§9 open question: no current annotator emits this field).
    #[serde(default = "default_reliability_score")]
    pub score: Option<f64>,
}

fn default_reliability_score() -> Option<f64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_method_round_trips() {
        for m in [
            DetectionMethod::ModelVideo,
            DetectionMethod::ModelText,
            DetectionMethod::ModelNocache,
        ] {
            assert_eq!(DetectionMethod::from_str(&m.to_string()).unwrap(), m);
        }
    }
}
