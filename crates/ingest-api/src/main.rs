mod controller;
mod error;
mod handlers;
mod setup;
mod state;

use ingest_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    config.validate()?;

    ingest_infra::init_telemetry(matches!(config.log_format, ingest_core::LogFormat::Json))
        .map_err(|e| anyhow::anyhow!("failed to initialize telemetry: {e}"))?;

    tracing::info!("configuration loaded and validated");

    let (_state, router) = setup::initialize_app(config.clone()).await?;

    setup::server::start_server(&config, router).await?;

    Ok(())
}
