use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use imagecast::application::ports::{Archiver, JobRepository, StagingStore, Transcoder};
use imagecast::application::services::{
    BulkConversionService, ConversionWorker, ImageConversionService, JobStatusService,
};
use imagecast::infrastructure::archive::ZipArchiver;
use imagecast::infrastructure::observability::{TracingConfig, init_tracing};
use imagecast::infrastructure::persistence::{InMemoryJobRepository, PgJobRepository, create_pool};
use imagecast::infrastructure::storage::LocalStagingStore;
use imagecast::infrastructure::transcoding::ImageTranscoder;
use imagecast::presentation::{AppState, Environment, Settings, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env().map_err(anyhow::Error::msg)?;
    let settings = Settings::load(environment)?;

    let defaults = TracingConfig::default();
    init_tracing(
        TracingConfig {
            environment: environment.to_string(),
            json_format: settings.logging.enable_json || defaults.json_format,
            default_level: settings.logging.level.clone(),
        },
        settings.server.port,
    );

    let job_repository: Arc<dyn JobRepository> = match &settings.database.url {
        Some(url) => {
            let pool = create_pool(url, settings.database.max_connections).await?;
            Arc::new(PgJobRepository::new(pool))
        }
        None => {
            tracing::info!("No database configured, using in-memory job store");
            Arc::new(InMemoryJobRepository::new())
        }
    };

    let staging_store: Arc<dyn StagingStore> = Arc::new(LocalStagingStore::new(PathBuf::from(
        &settings.storage.staging_path,
    ))?);
    let archive_store: Arc<dyn StagingStore> = Arc::new(LocalStagingStore::new(PathBuf::from(
        &settings.storage.archive_path,
    ))?);
    let transcoder: Arc<dyn Transcoder> = Arc::new(ImageTranscoder::with_max_in_flight(
        settings.conversion.max_concurrent_jobs * settings.conversion.max_parallel_conversions,
    ));
    let archiver: Arc<dyn Archiver> = Arc::new(ZipArchiver::new());

    let (sender, receiver) = mpsc::channel(settings.conversion.queue_capacity.max(1));

    let worker = ConversionWorker::new(
        receiver,
        Arc::clone(&transcoder),
        archiver,
        Arc::clone(&job_repository),
        staging_store,
        Arc::clone(&archive_store),
        settings.conversion.worker_config(),
    );
    if let Err(e) = worker.recover_interrupted_jobs().await {
        tracing::warn!(error = %e, "Could not recover interrupted jobs");
    }
    tokio::spawn(worker.run());

    let state = AppState {
        bulk_conversion_service: Arc::new(BulkConversionService::new(
            Arc::clone(&job_repository),
            sender,
            settings.conversion.batch_limits(),
        )),
        job_status_service: Arc::new(JobStatusService::new(
            Arc::clone(&job_repository),
            archive_store,
            settings.server.public_base_url.clone(),
        )),
        image_conversion_service: Arc::new(ImageConversionService::new(
            transcoder,
            settings.conversion.conversion_timeout(),
        )),
    };

    let router = create_router(state);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}
