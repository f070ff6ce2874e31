//! CatalogTool (§4.6): the two functions the LM calls during the
//! function-call loop, backed by `ingest_db::FineUnitRepository`.

use chrono::Utc;
use ingest_core::{pos_to_db_code, FineUnit, IngestError};
use ingest_db::FineUnitRepository;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FineUnitCandidate {
    pub fine_id: i64,
    pub label: String,
    pub pos: Option<String>,
    pub definition: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryFineUnitsResult {
    pub candidates: Vec<FineUnitCandidate>,
    pub lemma: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFineUnitResult {
    pub fine_id: i64,
    pub status: String,
    pub note: String,
}

/// Backs the two tool declarations the LM is given: `query_fine_units` and
/// `create_fine_unit` (§4.6).
#[derive(Clone)]
pub struct CatalogTool {
    repo: FineUnitRepository,
    model_name: String,
}

impl CatalogTool {
    pub fn new(repo: FineUnitRepository, model_name: String) -> Self {
        Self { repo, model_name }
    }

    /// Case-insensitive lookup on `label`, filtered by `kind`/`lang`/
    /// `status='active'` and an optional POS. Empty result surfaces
    /// `found=false` via an empty `candidates` vec — not an error (§7).
    #[tracing::instrument(skip(self), fields(lemma = %lemma, kind = %kind))]
    pub async fn query_fine_units(
        &self,
        lemma: &str,
        kind: &str,
        pos: Option<&str>,
        lang: &str,
    ) -> Result<QueryFineUnitsResult, IngestError> {
        let pos_code = pos.and_then(pos_to_db_code);
        let rows = self.repo.query_active(lemma, kind, lang, pos_code).await?;

        Ok(QueryFineUnitsResult {
            candidates: rows.into_iter().map(fine_unit_to_candidate).collect(),
            lemma: lemma.to_string(),
        })
    }

    /// Insert a `pending` fine unit, converging on `external_key =
    /// {model}:{lemma}:def_{md5(definition)[:8]}` (§4.6, §9). A collision on
    /// this key returns the existing row — "a collision is a feature, not
    /// an error."
    #[tracing::instrument(skip(self, definition, video_uid), fields(lemma = %lemma, kind = %kind))]
    pub async fn create_fine_unit(
        &self,
        lemma: &str,
        kind: &str,
        pos: &str,
        definition: &str,
        lang: &str,
        video_uid: &str,
    ) -> Result<CreateFineUnitResult, IngestError> {
        let external_key = external_key(&self.model_name, lemma, definition);

        if let Some(existing) = self.repo.find_by_external_key(&external_key).await? {
            return Ok(CreateFineUnitResult {
                fine_id: existing.id,
                status: existing.status,
                note: "existing fine unit converged on external_key".to_string(),
            });
        }

        let pos_code = pos_to_db_code(pos);
        let meta = serde_json::json!({
            "model": self.model_name,
            "lemma": lemma,
            "pos": pos,
            "created_at": Utc::now().to_rfc3339(),
            "video_uid": video_uid,
        });

        let created = self
            .repo
            .create_pending(&external_key, kind, lemma, lang, pos_code, definition, meta)
            .await?;

        Ok(CreateFineUnitResult {
            fine_id: created.id,
            status: created.status,
            note: "created pending fine unit".to_string(),
        })
    }
}

fn fine_unit_to_candidate(f: FineUnit) -> FineUnitCandidate {
    FineUnitCandidate {
        fine_id: f.id,
        label: f.label,
        pos: f.pos,
        definition: f.def,
    }
}

/// `external_key = model:lemma:def_{md5(definition)[:8]}` (§4.6, §9, GLOSSARY).
pub fn external_key(model: &str, lemma: &str, definition: &str) -> String {
    let digest = md5::compute(definition.as_bytes());
    let hex = format!("{digest:x}");
    format!("{model}:{lemma}:def_{}", &hex[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_key_is_deterministic() {
        let a = external_key("gemini-2.0", "give up", "to stop doing something");
        let b = external_key("gemini-2.0", "give up", "to stop doing something");
        assert_eq!(a, b);
        assert!(a.starts_with("gemini-2.0:give up:def_"));
    }

    #[test]
    fn external_key_varies_with_definition() {
        let a = external_key("gemini-2.0", "give up", "to stop doing something");
        let b = external_key("gemini-2.0", "give up", "a different sense entirely");
        assert_ne!(a, b);
    }
}
