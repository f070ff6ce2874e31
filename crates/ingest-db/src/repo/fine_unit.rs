//! FineUnit catalog repository (§4.6). Backs `CatalogTool`'s
//! `query_fine_units`/`create_fine_unit` operations.

use ingest_core::{FineUnit, IngestError};
use sqlx::{PgPool, Postgres};

#[derive(Clone)]
pub struct FineUnitRepository {
    pool: PgPool,
}

impl FineUnitRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Case-insensitive lookup on `label`, filtered by `kind`, `lang`,
    /// `status='active'`, and an optional single-letter `pos` code.
    /// Capped at 50 rows (§4.6).
    #[tracing::instrument(skip(self), fields(db.table = "fine_unit", label = %label, kind = %kind))]
    pub async fn query_active(
        &self,
        label: &str,
        kind: &str,
        lang: &str,
        pos: Option<char>,
    ) -> Result<Vec<FineUnit>, IngestError> {
        let rows = sqlx::query_as::<Postgres, FineUnit>(
            r#"
            SELECT * FROM semantic.fine_unit
            WHERE lower(label) = lower($1)
              AND kind = $2
              AND lang = $3
              AND status = 'active'
              AND ($4::char IS NULL OR pos = $4::text)
            ORDER BY id
            LIMIT 50
            "#,
        )
        .bind(label)
        .bind(kind)
        .bind(lang)
        .bind(pos.map(|c| c.to_string()))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[tracing::instrument(skip(self), fields(db.table = "fine_unit", external_key = %external_key))]
    pub async fn find_by_external_key(
        &self,
        external_key: &str,
    ) -> Result<Option<FineUnit>, IngestError> {
        let row = sqlx::query_as::<Postgres, FineUnit>(
            "SELECT * FROM semantic.fine_unit WHERE external_key = $1",
        )
        .bind(external_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Insert a `pending` fine unit for `external_key`, or return the
    /// existing row if one already converged to this key (§4.6, §9 —
    /// "a collision at this key is a feature, not an error").
    #[tracing::instrument(skip(self, meta), fields(db.table = "fine_unit", external_key = %external_key))]
    pub async fn create_pending(
        &self,
        external_key: &str,
        kind: &str,
        label: &str,
        lang: &str,
        pos: Option<char>,
        def: &str,
        meta: serde_json::Value,
    ) -> Result<FineUnit, IngestError> {
        let row = sqlx::query_as::<Postgres, FineUnit>(
            r#"
            INSERT INTO semantic.fine_unit (kind, label, lang, pos, def, status, external_key, meta, created_at)
            VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7, now())
            ON CONFLICT (external_key) DO UPDATE SET external_key = EXCLUDED.external_key
            RETURNING *
            "#,
        )
        .bind(kind)
        .bind(label)
        .bind(lang)
        .bind(pos.map(|c| c.to_string()))
        .bind(def)
        .bind(external_key)
        .bind(meta)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }
}
