//! Ingestion infrastructure: cross-cutting concerns with no domain logic.
//!
//! - HTTP middleware (request ID, security headers)
//! - Tracing/logging initialization
//! - The object-store signed-URL client trait used by `ingest-plugins`'
//!   adapters

pub mod middleware;
pub mod object_store;
pub mod telemetry;

pub use middleware::{get_request_id, request_id_middleware, security_headers_middleware, RequestId};
pub use object_store::{object_uri, ObjectStoreClient, SignerHttpObjectStore};
pub use telemetry::{init_telemetry, shutdown_telemetry};
