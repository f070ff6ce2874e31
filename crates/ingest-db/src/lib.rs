//! Ingest DB
//!
//! Postgres access for the ingestion pipeline: the transaction guard,
//! and one repository per entity (`video`, `ingest_jobs`, `segment` +
//! `occurrence`, `fine_unit`).

pub mod repo;
pub mod transaction;

pub use repo::{
    FineUnitRepository, IdempotencyDecision, IngestJobRepository, PersistenceRepository,
    SaveSummary, VideoRepository,
};
pub use transaction::{with_transaction, TransactionGuard};
