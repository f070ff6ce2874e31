//! Application wiring, extracted from `main.rs` for testability (the
//! teacher's `setup::initialize_app` shape).

pub mod database;
pub mod routes;
pub mod server;
pub mod services;

use std::sync::Arc;

use anyhow::Result;
use ingest_core::Config;

use crate::state::AppState;

pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    let pool = database::setup_database(&config).await?;
    let state = services::build_app_state(config, pool)?;
    let router = routes::build_router(state.clone());
    Ok((state, router))
}
