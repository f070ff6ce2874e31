//! Application state.
//!
//! One flat `AppState` (no sub-state `FromRef` splitting — this service has
//! a single handler family) built once in `setup::initialize_app` and
//! shared behind an `Arc` across the router.

use std::sync::Arc;

use ingest_core::Config;
use sqlx::PgPool;

use crate::controller::IngestController;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub controller: Arc<IngestController>,
}

fn _assert_app_state_send_sync() {
    fn assert<T: Send + Sync + 'static>() {}
    assert::<AppState>();
}
