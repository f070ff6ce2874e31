//! Tracing/logging initialization for the ingestion worker.

mod init_basic;

pub use init_basic::{init_telemetry, shutdown_telemetry};
