//! Wires `Config` + the database pool into every repository, adapter, and
//! service, then assembles the `IngestController` behind `AppState`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use ingest_core::Config;
use ingest_db::{FineUnitRepository, IngestJobRepository, PersistenceRepository, VideoRepository};
use ingest_infra::{ObjectStoreClient, SignerHttpObjectStore};
use ingest_plugins::{AsrAdapter, TranscodingAdapter};
use ingest_services::{AnnotationOrchestrator, CatalogTool, LmDriver, NotifierGateway};
use sqlx::PgPool;

use crate::controller::IngestController;
use crate::state::AppState;

pub fn build_app_state(config: Config, pool: PgPool) -> Result<Arc<AppState>> {
    let http_client = reqwest::Client::builder()
        .timeout(config.http_client_timeout())
        .build()?;

    let object_store: Arc<dyn ObjectStoreClient> = Arc::new(SignerHttpObjectStore::new(
        http_client.clone(),
        config.object_store_signer_url.clone(),
    ));

    let retry_backoff = Duration::from_secs(config.retry_backoff_seconds);

    let transcoding = TranscodingAdapter::new(
        http_client.clone(),
        object_store.clone(),
        config.transcoder_api_base_url.clone(),
        config.transcoder_api_key.clone(),
        config.max_retries,
        retry_backoff,
    );

    let asr = AsrAdapter::new(
        http_client.clone(),
        object_store.clone(),
        config.asr_api_base_url.clone(),
        config.asr_api_key.clone(),
        config.max_retries,
        retry_backoff,
    );

    let lm_driver = LmDriver::new(
        http_client.clone(),
        config.lm_api_base_url.clone(),
        config.lm_api_key.clone(),
        config.model_name.clone(),
        Duration::from_secs(180),
    );

    let fine_unit_repo = FineUnitRepository::new(pool.clone());
    let catalog_tool = CatalogTool::new(fine_unit_repo, config.model_name.clone());

    let notifier = NotifierGateway::with_timeout(
        config.notifier_webhook_url.clone(),
        config.http_client_timeout(),
    )?;

    let orchestrator = AnnotationOrchestrator::new(
        lm_driver,
        catalog_tool,
        notifier.clone(),
        config.model_name.clone(),
        config.max_concurrency,
        config.cache_ttl(),
    );

    let video_repo = VideoRepository::new(pool.clone());
    let ingest_job_repo = IngestJobRepository::new(pool.clone());
    let persistence_repo = PersistenceRepository::new(pool.clone());

    let controller = IngestController::new(
        config.clone(),
        video_repo,
        ingest_job_repo,
        persistence_repo,
        transcoding,
        asr,
        orchestrator,
        notifier,
        object_store,
    );

    Ok(Arc::new(AppState {
        pool,
        config,
        controller: Arc::new(controller),
    }))
}
