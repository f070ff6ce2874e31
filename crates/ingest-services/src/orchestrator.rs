//! AnnotationOrchestrator (§4.3): per-video cache creation with fallback,
//! semaphore-bounded segment fan-out, phrase-before-word ordering, and
//! failure isolation.
//!
//! The concurrency primitive: an `Arc<Semaphore>`, one `tokio::spawn` per
//! unit of work acquiring an owned permit, the caller awaiting every
//! `JoinHandle` rather than racing ahead with `join_all`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ingest_core::models::{Annotation, DetectionMethod, Segment, Span};
use ingest_core::IngestError;
use tokio::sync::Semaphore;

use crate::annotator::{Annotator, AnnotatorKind, PhraseAnnotator, WordAnnotator};
use crate::catalog_tool::CatalogTool;
use crate::lm_driver::{CacheHandle, LmDriver, ToolHandler};
use crate::notifier::NotifierGateway;

const SYSTEM_INSTRUCTION: &str = "You annotate transcript segments with canonical catalog entries \
(fine units) for language-learning content. You must call query_fine_units before proposing any \
fine_id; never invent one. Prefer phrases over their constituent words.";

/// Output of one orchestrator run over a video's segments (§4.3, §4.7:
/// `method` and `ontology_ver` are recorded on every occurrence).
pub struct AnnotationResult {
    pub annotations: Vec<Annotation>,
    pub method: DetectionMethod,
    pub ontology_ver: String,
}

pub struct AnnotationOrchestrator {
    lm: Arc<LmDriver>,
    catalog: CatalogTool,
    notifier: NotifierGateway,
    model_name: String,
    max_concurrency: usize,
    cache_ttl: Duration,
    lang: String,
}

impl AnnotationOrchestrator {
    pub fn new(
        lm: LmDriver,
        catalog: CatalogTool,
        notifier: NotifierGateway,
        model_name: String,
        max_concurrency: usize,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            lm: Arc::new(lm),
            catalog,
            notifier,
            model_name,
            max_concurrency,
            cache_ttl,
            lang: "en".to_string(),
        }
    }

    /// Try multimodal, then text-only, then no-cache, in that order (§4.3
    /// step 1). The first that succeeds determines `method`.
    #[tracing::instrument(skip(self, segments, video_uri), fields(video_uid = %video_uid))]
    async fn create_cache_with_fallback(
        &self,
        video_uid: &str,
        video_uri: Option<&str>,
        segments: &[Segment],
    ) -> (Option<CacheHandle>, DetectionMethod) {
        let tools = tool_schema();
        let transcript = concatenated_transcript(segments);

        if let Some(uri) = video_uri {
            match self
                .lm
                .create_cached_content(Some(uri), &transcript, SYSTEM_INSTRUCTION, &tools, self.cache_ttl)
                .await
            {
                Ok(handle) => return (Some(handle), DetectionMethod::ModelVideo),
                Err(err) => {
                    tracing::warn!(video_uid, error = %err, "multimodal cache creation failed; falling back to text-only");
                }
            }
        }

        match self
            .lm
            .create_cached_content(None, &transcript, SYSTEM_INSTRUCTION, &tools, self.cache_ttl)
            .await
        {
            Ok(handle) => return (Some(handle), DetectionMethod::ModelText),
            Err(err) => {
                tracing::warn!(video_uid, error = %err, "text-only cache creation failed; falling back to no-cache");
            }
        }

        (None, DetectionMethod::ModelNocache)
    }

    /// Run the full annotation pipeline for one video (§4.3).
    #[tracing::instrument(skip(self, segments), fields(video_uid = %video_uid, segment_count = segments.len()))]
    pub async fn run(
        &self,
        video_uid: &str,
        video_uri: Option<&str>,
        segments: &[Segment],
    ) -> AnnotationResult {
        let (cache, method) = self.create_cache_with_fallback(video_uid, video_uri, segments).await;
        let cache = cache.map(Arc::new);
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));

        let mut handles = Vec::with_capacity(segments.len());
        for (index, segment) in segments.iter().cloned().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let lm = Arc::clone(&self.lm);
            let cache = cache.clone();
            let catalog = self.catalog.clone();
            let notifier = self.notifier.clone();
            let video_uid = video_uid.to_string();
            let lang = self.lang.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("semaphore closed unexpectedly");
                annotate_segment(
                    &lm,
                    cache.as_deref(),
                    &catalog,
                    &notifier,
                    &video_uid,
                    &lang,
                    &segment,
                    index,
                )
                .await
            });
            handles.push(handle);
        }

        let mut annotations = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(segment_annotations) => annotations.extend(segment_annotations),
                Err(join_err) => {
                    tracing::warn!(error = %join_err, "annotation task panicked; isolated per §4.3 rule 3");
                }
            }
        }

        AnnotationResult {
            annotations,
            method,
            ontology_ver: self.model_name.clone(),
        }
    }
}

/// Phrase annotation runs before word annotation for the same segment
/// (§4.3 step 2, §5 ordering); each contributes zero annotations on its own
/// failure (§4.3 step 3) rather than aborting the other.
#[allow(clippy::too_many_arguments)]
async fn annotate_segment(
    lm: &LmDriver,
    cache: Option<&CacheHandle>,
    catalog: &CatalogTool,
    notifier: &NotifierGateway,
    video_uid: &str,
    lang: &str,
    segment: &Segment,
    index: usize,
) -> Vec<Annotation> {
    let mut out = Vec::new();

    let phrase = run_one_annotator(
        &PhraseAnnotator,
        lm,
        cache,
        catalog,
        notifier,
        video_uid,
        lang,
        segment,
        index,
    )
    .await;
    out.extend(phrase);

    let word = run_one_annotator(
        &WordAnnotator,
        lm,
        cache,
        catalog,
        notifier,
        video_uid,
        lang,
        segment,
        index,
    )
    .await;
    out.extend(word);

    out
}

#[allow(clippy::too_many_arguments)]
async fn run_one_annotator(
    annotator: &dyn Annotator,
    lm: &LmDriver,
    cache: Option<&CacheHandle>,
    catalog: &CatalogTool,
    notifier: &NotifierGateway,
    video_uid: &str,
    lang: &str,
    segment: &Segment,
    index: usize,
) -> Vec<Annotation> {
    let instruction = annotator.build_instruction(segment, index);
    let tools = tool_schema();
    let schema = annotator.output_schema();
    let handler = CatalogToolHandler {
        catalog,
        notifier,
        video_uid,
        kind: annotator.kind(),
        lang,
        segment_index: index,
    };

    let result = lm
        .run(cache, &instruction, SYSTEM_INSTRUCTION, &tools, &schema, &handler)
        .await;

    let reply = match result {
        Ok(reply) => reply,
        Err(err) => {
            let failure = IngestError::AnnotationFailed {
                segment_index: index,
                annotator: annotator.kind().to_string(),
                message: err.to_string(),
            };
            tracing::warn!(error = %failure, "lm call failed; isolated, contributes zero annotations");
            return Vec::new();
        }
    };

    let candidates: Vec<Annotation> = match serde_json::from_value::<AnnotationsEnvelope>(reply) {
        Ok(envelope) => envelope.annotations,
        Err(err) => {
            tracing::warn!(error = %err, annotator = %annotator.kind(), "lm reply did not match output schema");
            return Vec::new();
        }
    };

    candidates
        .into_iter()
        .filter(|annotation| annotator.validate(annotation, segment, index))
        .collect()
}

#[derive(serde::Deserialize)]
struct AnnotationsEnvelope {
    #[serde(default)]
    annotations: Vec<Annotation>,
}

/// Bridges the LM's tool-call loop to `CatalogTool`, dispatching the
/// per-kind lookup-miss notification (phrase=warning, word=info) when
/// `query_fine_units` returns no candidates (§4.5, §4.8).
struct CatalogToolHandler<'a> {
    catalog: &'a CatalogTool,
    notifier: &'a NotifierGateway,
    video_uid: &'a str,
    kind: AnnotatorKind,
    lang: &'a str,
    segment_index: usize,
}

#[async_trait]
impl<'a> ToolHandler for CatalogToolHandler<'a> {
    async fn call(&self, name: &str, args: serde_json::Value) -> serde_json::Value {
        match name {
            "query_fine_units" => self.handle_query(args).await,
            "create_fine_unit" => self.handle_create(args).await,
            other => serde_json::json!({"error": format!("unknown tool: {other}")}),
        }
    }
}

impl<'a> CatalogToolHandler<'a> {
    async fn handle_query(&self, args: serde_json::Value) -> serde_json::Value {
        let lemma = args.get("lemma").and_then(|v| v.as_str()).unwrap_or_default();
        let kind = args.get("kind").and_then(|v| v.as_str()).unwrap_or_default();
        let pos = args.get("pos").and_then(|v| v.as_str());
        let lang = args.get("lang").and_then(|v| v.as_str()).unwrap_or(self.lang);

        match self.catalog.query_fine_units(lemma, kind, pos, lang).await {
            Ok(result) => {
                if result.candidates.is_empty() {
                    match self.kind {
                        AnnotatorKind::Phrase => {
                            self.notifier
                                .notify_phrase_not_found(lemma, self.segment_index, self.video_uid)
                                .await
                        }
                        AnnotatorKind::Word => {
                            self.notifier
                                .notify_word_not_found(lemma, self.segment_index, self.video_uid)
                                .await
                        }
                        AnnotatorKind::Grammar => {}
                    }
                }
                serde_json::to_value(&result).unwrap_or(serde_json::json!({"candidates": [], "lemma": lemma}))
            }
            Err(err) => serde_json::json!({"error": err.to_string()}),
        }
    }

    async fn handle_create(&self, args: serde_json::Value) -> serde_json::Value {
        let lemma = args.get("lemma").and_then(|v| v.as_str()).unwrap_or_default();
        let kind = args.get("kind").and_then(|v| v.as_str()).unwrap_or_default();
        let pos = args.get("pos").and_then(|v| v.as_str()).unwrap_or("N/A");
        let definition = args.get("definition").and_then(|v| v.as_str()).unwrap_or_default();
        let lang = args.get("lang").and_then(|v| v.as_str()).unwrap_or(self.lang);

        match self
            .catalog
            .create_fine_unit(lemma, kind, pos, definition, lang, self.video_uid)
            .await
        {
            Ok(result) => serde_json::to_value(&result).unwrap_or(serde_json::json!({"error": "serialization failed"})),
            Err(err) => serde_json::json!({"error": err.to_string()}),
        }
    }
}

fn concatenated_transcript(segments: &[Segment]) -> String {
    segments
        .iter()
        .enumerate()
        .map(|(i, s)| format!("[{i}] ({:.2}-{:.2}) {}", s.t_start, s.t_end, s.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Tool declarations handed to the LM: `query_fine_units` and
/// `create_fine_unit` (§4.6).
fn tool_schema() -> serde_json::Value {
    serde_json::json!({
        "functionDeclarations": [
            {
                "name": "query_fine_units",
                "description": "Look up catalog entries (fine units) by lemma/phrase, kind, and optional part of speech.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "lemma": {"type": "string"},
                        "kind": {"type": "string", "enum": ["word_sense", "phrase_sense"]},
                        "pos": {"type": "string"},
                        "lang": {"type": "string"}
                    },
                    "required": ["lemma", "kind"]
                }
            },
            {
                "name": "create_fine_unit",
                "description": "Insert a pending catalog entry when no existing fine unit matches.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "lemma": {"type": "string"},
                        "kind": {"type": "string", "enum": ["word_sense", "phrase_sense"]},
                        "pos": {"type": "string"},
                        "definition": {"type": "string"},
                        "lang": {"type": "string"}
                    },
                    "required": ["lemma", "kind", "pos", "definition"]
                }
            }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn segment(text: &str, start: f64, end: f64) -> Segment {
        Segment {
            id: 1,
            video_id: 1,
            t_start: start,
            t_end: end,
            text: text.to_string(),
            lang: "en".to_string(),
            meta: serde_json::Value::Null,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn concatenated_transcript_preserves_order_and_index() {
        let segments = vec![segment("hello", 0.0, 1.0), segment("world", 1.0, 2.0)];
        let transcript = concatenated_transcript(&segments);
        let hello_pos = transcript.find("hello").unwrap();
        let world_pos = transcript.find("world").unwrap();
        assert!(hello_pos < world_pos);
        assert!(transcript.starts_with("[0]"));
    }

    #[test]
    fn span_type_is_reexported_for_callers() {
        let _: Span = Span { start: 0, end: 1 };
    }
}
