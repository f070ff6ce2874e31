pub mod fine_unit;
pub mod ingest_job;
pub mod persistence;
pub mod video;

pub use fine_unit::FineUnitRepository;
pub use ingest_job::{IdempotencyDecision, IngestJobRepository};
pub use persistence::{PersistenceRepository, SaveSummary};
pub use video::VideoRepository;
