//! Phrase annotator (§4.5): multi-word expressions (phrasal verbs,
//! collocations, idioms), preferred over their constituent words.

use ingest_core::models::Segment;

use super::{Annotator, AnnotatorKind};

pub struct PhraseAnnotator;

impl Annotator for PhraseAnnotator {
    fn kind(&self) -> AnnotatorKind {
        AnnotatorKind::Phrase
    }

    fn build_instruction(&self, segment: &Segment, i: usize) -> String {
        format!(
            "Segment index {i}: \"{}\"\n\n\
             Identify multi-word expressions (phrasal verbs, collocations, idioms) in this \
             segment. A phrase must be preferred over annotating its constituent words \
             separately — if you find a phrase, do not also annotate the words inside it. \
             For each phrase, call query_fine_units(lemma, kind=\"phrase_sense\", pos=\"N/A\") \
             and pick exactly one returned fine_id from the candidates — never invent one. \
             The span must cover the whole phrase. \
             Score visual_comprehensibility and textual_comprehensibility on [0,1]. \
             If query_fine_units returns no candidates for a phrase, omit that phrase entirely; \
             do not call create_fine_unit.",
            segment.text
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn instruction_requires_whole_phrase_span() {
        let seg = Segment {
            id: 1,
            video_id: 1,
            t_start: 0.0,
            t_end: 1.0,
            text: "I want to give up learning English".to_string(),
            lang: "en".to_string(),
            meta: serde_json::Value::Null,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let instruction = PhraseAnnotator.build_instruction(&seg, 0);
        assert!(instruction.contains("span must cover the whole phrase"));
        assert!(instruction.contains("phrase_sense"));
    }
}
