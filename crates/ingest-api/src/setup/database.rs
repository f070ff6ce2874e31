//! Database pool setup (§5: "a process-wide mutable resource; its cap is
//! configurable").

use anyhow::{Context, Result};
use ingest_core::Config;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub async fn setup_database(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_pool_size)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    sqlx::migrate!("../ingest-db/migrations")
        .run(&pool)
        .await
        .context("failed to run database migrations")?;

    Ok(pool)
}
