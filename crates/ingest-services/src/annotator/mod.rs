//! Annotators (§4.5): shared contract for the word and phrase annotators
//! that drive `LMDriver` over one segment.

mod phrase;
mod word;

pub use phrase::PhraseAnnotator;
pub use word::WordAnnotator;

use std::fmt;

use ingest_core::models::Annotation;
use ingest_core::models::Segment;

/// Which annotator produced a given annotation. `Grammar` is reserved but
/// intentionally unconstructed (§4.5, §9: declared-but-unimplemented in the
/// source this was distilled from).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotatorKind {
    Word,
    Phrase,
    #[allow(dead_code)]
    Grammar,
}

impl fmt::Display for AnnotatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnnotatorKind::Word => "word",
            AnnotatorKind::Phrase => "phrase",
            AnnotatorKind::Grammar => "grammar",
        };
        write!(f, "{s}")
    }
}

/// Shared contract for a segment-level annotator (§4.5).
pub trait Annotator {
    fn kind(&self) -> AnnotatorKind;

    /// The user instruction LMDriver sends for segment `i`.
    fn build_instruction(&self, segment: &Segment, i: usize) -> String;

    /// The JSON response schema the LM's output must conform to:
    /// `{ annotations: [ {segment_index, fine_id, span, rationale,
    /// visual_comprehensibility, textual_comprehensibility} ] }` (§4.5).
    fn output_schema(&self) -> serde_json::Value {
        default_output_schema()
    }

    /// Validate one candidate annotation against segment `i`. Invalid
    /// items are dropped with a warning by the caller (§4.5).
    fn validate(&self, annotation: &Annotation, segment: &Segment, i: usize) -> bool {
        validate_annotation(annotation, segment, i)
    }
}

fn default_output_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "annotations": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "segment_index": {"type": "integer"},
                        "fine_id": {"type": "integer"},
                        "span": {
                            "type": "object",
                            "properties": {
                                "start": {"type": "integer"},
                                "end": {"type": "integer"}
                            },
                            "required": ["start", "end"]
                        },
                        "rationale": {"type": "string"},
                        "visual_comprehensibility": {"type": "number"},
                        "textual_comprehensibility": {"type": "number"}
                    },
                    "required": [
                        "segment_index",
                        "fine_id",
                        "span",
                        "rationale",
                        "visual_comprehensibility",
                        "textual_comprehensibility"
                    ]
                }
            }
        },
        "required": ["annotations"]
    })
}

/// `validate` enforces (§4.5): `segment_index == i`; `0 ≤ span.start <
/// span.end ≤ len(segment.text)`; both comprehensibilities finite in
/// [0,1]; rationale non-empty.
pub fn validate_annotation(annotation: &Annotation, segment: &Segment, i: usize) -> bool {
    if annotation.segment_index != i {
        return false;
    }
    if annotation.rationale.trim().is_empty() {
        return false;
    }
    let len = segment.text.chars().count() as i64;
    if annotation.span.start < 0 || annotation.span.start >= annotation.span.end {
        return false;
    }
    if annotation.span.end > len {
        return false;
    }
    for score in [
        annotation.visual_comprehensibility,
        annotation.textual_comprehensibility,
    ] {
        if !score.is_finite() || !(0.0..=1.0).contains(&score) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ingest_core::models::Span;

    fn segment(text: &str) -> Segment {
        Segment {
            id: 1,
            video_id: 1,
            t_start: 0.0,
            t_end: 3.5,
            text: text.to_string(),
            lang: "en".to_string(),
            meta: serde_json::Value::Null,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn annotation(span: Span, visual: f64, textual: f64) -> Annotation {
        Annotation {
            segment_index: 0,
            fine_id: 1,
            span,
            rationale: "because".to_string(),
            visual_comprehensibility: visual,
            textual_comprehensibility: textual,
            score: None,
        }
    }

    #[test]
    fn rejects_wrong_segment_index() {
        let seg = segment("I want to give up learning English");
        let mut a = annotation(Span { start: 10, end: 17 }, 0.8, 0.7);
        a.segment_index = 1;
        assert!(!validate_annotation(&a, &seg, 0));
    }

    #[test]
    fn rejects_out_of_range_span() {
        let seg = segment("give up");
        let a = annotation(Span { start: 0, end: 999 }, 0.8, 0.7);
        assert!(!validate_annotation(&a, &seg, 0));
    }

    #[test]
    fn rejects_inverted_span() {
        let seg = segment("give up");
        let a = annotation(Span { start: 5, end: 2 }, 0.8, 0.7);
        assert!(!validate_annotation(&a, &seg, 0));
    }

    #[test]
    fn rejects_out_of_range_score() {
        let seg = segment("give up");
        let a = annotation(Span { start: 0, end: 4 }, 1.5, 0.7);
        assert!(!validate_annotation(&a, &seg, 0));
    }

    #[test]
    fn rejects_empty_rationale() {
        let seg = segment("give up");
        let mut a = annotation(Span { start: 0, end: 4 }, 0.8, 0.7);
        a.rationale = "   ".to_string();
        assert!(!validate_annotation(&a, &seg, 0));
    }

    #[test]
    fn accepts_well_formed_annotation() {
        let seg = segment("I want to give up learning English");
        let a = annotation(Span { start: 10, end: 17 }, 0.85, 0.7);
        assert!(validate_annotation(&a, &seg, 0));
    }
}
