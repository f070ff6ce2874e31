//! Word annotator (§4.5): content-word lemmas (noun/verb/adj/adv).

use ingest_core::models::Segment;

use super::{Annotator, AnnotatorKind};

pub struct WordAnnotator;

impl Annotator for WordAnnotator {
    fn kind(&self) -> AnnotatorKind {
        AnnotatorKind::Word
    }

    fn build_instruction(&self, segment: &Segment, i: usize) -> String {
        format!(
            "Segment index {i}: \"{}\"\n\n\
             Identify content-word lemmas (nouns, verbs, adjectives, adverbs) in this segment \
             that are worth teaching. For each lemma, call query_fine_units(lemma, kind=\"word_sense\", pos) \
             and pick exactly one returned fine_id from the candidates — never invent one. \
             Score visual_comprehensibility and textual_comprehensibility on [0,1]. \
             If query_fine_units returns no candidates for a lemma, omit that lemma entirely; do not call create_fine_unit.",
            segment.text
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn instruction_includes_segment_text_and_index() {
        let seg = Segment {
            id: 1,
            video_id: 1,
            t_start: 0.0,
            t_end: 1.0,
            text: "give up learning".to_string(),
            lang: "en".to_string(),
            meta: serde_json::Value::Null,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let instruction = WordAnnotator.build_instruction(&seg, 2);
        assert!(instruction.contains("give up learning"));
        assert!(instruction.contains("Segment index 2"));
    }
}
