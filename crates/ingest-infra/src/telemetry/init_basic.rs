use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize process-wide tracing.
///
/// `json` selects `tracing_subscriber::fmt::layer().json()` (for ingestion
/// into a log aggregator); otherwise the human-readable pretty formatter is
/// used. Filtering is controlled by `RUST_LOG`, falling back to a sane
/// per-crate default.
pub fn init_telemetry(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ingest=info,tower_http=info".into());

    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    Ok(())
}

pub async fn shutdown_telemetry() {
    tracing::debug!("telemetry shutdown");
}
