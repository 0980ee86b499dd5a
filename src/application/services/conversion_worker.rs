use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use futures::stream;
use tokio::sync::{Semaphore, mpsc};
use tracing::Instrument;

use crate::application::ports::{
    ArchiveEntry, Archiver, ArchiverError, JobRepository, RepositoryError, StagingStore,
    StagingStoreError, Transcoder,
};
use crate::domain::{
    ConversionParameters, JobId, JobStatus, SourceImage, StatusUpdate, StoragePath,
};

use super::bulk_conversion_service::BulkConversionMessage;
use super::staged_outputs::{StagedOutput, StagedOutputs};

pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 4;
pub const DEFAULT_MAX_PARALLEL_CONVERSIONS: usize = 4;
pub const DEFAULT_CONVERSION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub max_concurrent_jobs: usize,
    pub max_parallel_conversions: usize,
    pub conversion_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
            max_parallel_conversions: DEFAULT_MAX_PARALLEL_CONVERSIONS,
            conversion_timeout: DEFAULT_CONVERSION_TIMEOUT,
        }
    }
}

/// Why a single image of a batch produced no output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFailure {
    pub index: usize,
    pub filename: String,
    pub reason: String,
}

/// Result of attempting every image of a batch.
pub struct ConversionTally {
    pub staged: StagedOutputs,
    pub failures: Vec<ImageFailure>,
}

impl ConversionTally {
    fn record(&mut self, result: Result<StagedOutput, ImageFailure>) {
        match result {
            Ok(output) => self.staged.push(output),
            Err(failure) => {
                tracing::warn!(
                    index = failure.index,
                    filename = %failure.filename,
                    reason = %failure.reason,
                    "Image conversion failed, continuing with remaining images"
                );
                self.failures.push(failure);
            }
        }
    }
}

/// Background side of bulk conversion.
///
/// Receives admitted jobs and runs each one on its own task, at most
/// `max_concurrent_jobs` at a time. Within a job, images are converted with at
/// most `max_parallel_conversions` in flight.
pub struct ConversionWorker {
    receiver: mpsc::Receiver<BulkConversionMessage>,
    pipeline: Arc<ConversionPipeline>,
    job_slots: Arc<Semaphore>,
}

struct ConversionPipeline {
    transcoder: Arc<dyn Transcoder>,
    archiver: Arc<dyn Archiver>,
    job_repository: Arc<dyn JobRepository>,
    staging_store: Arc<dyn StagingStore>,
    archive_store: Arc<dyn StagingStore>,
    config: WorkerConfig,
}

impl ConversionWorker {
    pub fn new(
        receiver: mpsc::Receiver<BulkConversionMessage>,
        transcoder: Arc<dyn Transcoder>,
        archiver: Arc<dyn Archiver>,
        job_repository: Arc<dyn JobRepository>,
        staging_store: Arc<dyn StagingStore>,
        archive_store: Arc<dyn StagingStore>,
        config: WorkerConfig,
    ) -> Self {
        let job_slots = Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1)));
        Self {
            receiver,
            pipeline: Arc::new(ConversionPipeline {
                transcoder,
                archiver,
                job_repository,
                staging_store,
                archive_store,
                config,
            }),
            job_slots,
        }
    }

    /// Fails jobs a previous process left unfinished. Their images only ever
    /// lived in that process's memory, so they can never complete.
    pub async fn recover_interrupted_jobs(&self) -> Result<usize, RepositoryError> {
        let repository = &self.pipeline.job_repository;
        let mut recovered = 0;

        for status in [JobStatus::Pending, JobStatus::Processing] {
            for job in repository.list_by_status(status).await? {
                match repository
                    .update_status(job.id, StatusUpdate::failed("interrupted by service restart"))
                    .await
                {
                    Ok(_) => recovered += 1,
                    Err(e) => {
                        tracing::warn!(error = %e, job_id = %job.id, "Failed to recover interrupted job")
                    }
                }
            }
        }

        if recovered > 0 {
            tracing::warn!(count = recovered, "Marked interrupted jobs as failed");
        }
        Ok(recovered)
    }

    pub async fn run(mut self) {
        tracing::info!(
            max_concurrent_jobs = self.pipeline.config.max_concurrent_jobs,
            max_parallel_conversions = self.pipeline.config.max_parallel_conversions,
            "Conversion worker started"
        );

        while let Some(msg) = self.receiver.recv().await {
            let permit = match Arc::clone(&self.job_slots).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let pipeline = Arc::clone(&self.pipeline);

            tokio::spawn(async move {
                pipeline.run_job(msg).await;
                drop(permit);
            });
        }

        tracing::info!("Conversion worker stopped: channel closed");
    }
}

impl ConversionPipeline {
    /// Error boundary around one job: whatever happens inside, the job ends
    /// `completed` or `failed`.
    async fn run_job(self: Arc<Self>, msg: BulkConversionMessage) {
        let job_id = msg.job_id;
        let span = tracing::info_span!(
            "bulk_conversion_job",
            job_id = %job_id,
            file_count = msg.images.len(),
            format = %msg.parameters.output_format,
        );

        let pipeline = Arc::clone(&self);
        let outcome = tokio::spawn(
            async move { pipeline.process_job(msg).await }.instrument(span.clone()),
        )
        .await;

        let error_message = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => format!("bulk conversion failed: {}", e),
            Err(join_error) if join_error.is_panic() => {
                "bulk conversion failed: worker task panicked".to_string()
            }
            Err(_) => "bulk conversion failed: worker task cancelled".to_string(),
        };

        async {
            tracing::error!(error = %error_message, "Bulk conversion job aborted");
            if let Err(e) = self
                .job_repository
                .update_status(job_id, StatusUpdate::failed(error_message))
                .await
            {
                tracing::error!(error = %e, "Failed to mark aborted job as failed");
            }
        }
        .instrument(span)
        .await;
    }

    async fn process_job(&self, msg: BulkConversionMessage) -> Result<(), ConversionWorkerError> {
        let BulkConversionMessage {
            job_id,
            parameters,
            images,
        } = msg;
        let total = images.len();

        tracing::debug!("Starting bulk conversion");

        let tally = self.convert_all(job_id, &parameters, images).await;
        let converted = tally.staged.len() as u32;
        let failed = tally.failures.len() as u32;

        let update = if tally.staged.is_empty() {
            let first_reason = tally
                .failures
                .first()
                .map(|f| f.reason.as_str())
                .unwrap_or("no images were attempted");
            StatusUpdate::Failed {
                error_message: format!(
                    "All {} image(s) failed to convert; first error: {}",
                    total, first_reason
                ),
                converted,
                failed,
            }
        } else {
            match self.build_archive(job_id, &tally.staged).await {
                Ok(archive_ref) => StatusUpdate::Completed {
                    archive_ref,
                    converted,
                    failed,
                },
                Err(e) => {
                    tracing::error!(error = %e, "Archive creation failed");
                    StatusUpdate::Failed {
                        error_message: format!("archive creation failed: {}", e),
                        converted,
                        failed,
                    }
                }
            }
        };

        let released = tally.staged.release().await;
        tracing::debug!(released, "Staged outputs released");

        let status = update.status();
        self.job_repository
            .update_status(job_id, update)
            .await
            .map_err(ConversionWorkerError::Repository)?;

        tracing::info!(
            status = %status,
            converted,
            failed,
            "Bulk conversion job finished"
        );
        Ok(())
    }

    async fn convert_all(
        &self,
        job_id: JobId,
        parameters: &ConversionParameters,
        images: Vec<SourceImage>,
    ) -> ConversionTally {
        let tally = ConversionTally {
            staged: StagedOutputs::new(Arc::clone(&self.staging_store)),
            failures: Vec::new(),
        };

        stream::iter(images.into_iter().enumerate())
            .map(|(index, image)| self.convert_one(job_id, parameters, index, image))
            .buffer_unordered(self.config.max_parallel_conversions.max(1))
            .fold(tally, |mut tally, result| async move {
                tally.record(result);
                tally
            })
            .await
    }

    async fn convert_one(
        &self,
        job_id: JobId,
        parameters: &ConversionParameters,
        index: usize,
        image: SourceImage,
    ) -> Result<StagedOutput, ImageFailure> {
        let failure = |reason: String| ImageFailure {
            index,
            filename: image.filename.clone(),
            reason,
        };

        // Elapsing only abandons the wait; the transcoder keeps its slot until
        // the blocking work returns.
        let converted = match tokio::time::timeout(
            self.config.conversion_timeout,
            self.transcoder.convert(&image.data, parameters),
        )
        .await
        {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => return Err(failure(e.to_string())),
            Err(_) => {
                return Err(failure(format!(
                    "timed out after {} ms",
                    self.config.conversion_timeout.as_millis()
                )));
            }
        };

        let filename = image.batch_output_filename(index, parameters.output_format);
        let path = StoragePath::staged_output(&job_id, &filename);
        self.staging_store
            .store(&path, Bytes::from(converted))
            .await
            .map_err(|e| failure(format!("staging failed: {}", e)))?;

        tracing::debug!(index, filename = %filename, "Image converted");
        Ok(StagedOutput {
            index,
            filename,
            path,
        })
    }

    async fn build_archive(
        &self,
        job_id: JobId,
        staged: &StagedOutputs,
    ) -> Result<String, ConversionWorkerError> {
        let mut entries = Vec::with_capacity(staged.len());
        for output in staged.iter() {
            let data = self
                .staging_store
                .fetch(&output.path)
                .await
                .map_err(ConversionWorkerError::Staging)?;
            entries.push(ArchiveEntry::new(output.filename.clone(), data));
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let archive = self
            .archiver
            .bundle(entries)
            .await
            .map_err(ConversionWorkerError::Archive)?;

        let path = StoragePath::archive(&job_id);
        let size = self
            .archive_store
            .store(&path, Bytes::from(archive))
            .await
            .map_err(ConversionWorkerError::Staging)?;

        tracing::info!(archive = %path, bytes = size, "Archive stored");
        Ok(path.as_str().to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConversionWorkerError {
    #[error("archive: {0}")]
    Archive(ArchiverError),
    #[error("staging store: {0}")]
    Staging(StagingStoreError),
    #[error("repository: {0}")]
    Repository(RepositoryError),
}
