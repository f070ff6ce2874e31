//! Ingest API
//!
//! The HTTP surface for the ingestion orchestrator: the ingress webhook
//! (§6 `POST /webhooks/video-ingestion`) and a liveness probe
//! (`GET /health`). Everything else — the state machine, the adapters, the
//! annotation engine, persistence — lives in `ingest-core`/`ingest-db`/
//! `ingest-plugins`/`ingest-services`; this crate only decodes HTTP,
//! dispatches into `IngestController`, and renders responses.

pub mod controller;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;

pub use controller::{IngestController, IngestOutcome, PipelineSummary};
pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
