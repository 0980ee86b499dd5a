use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::application::ports::{JobRepository, RepositoryError};
use crate::domain::{ConversionJob, ConversionParameters, JobId, ParameterError, SourceImage};

pub const DEFAULT_MAX_FILES_PER_BATCH: usize = 20;
pub const DEFAULT_MAX_FILE_SIZE_BYTES: usize = 5 * 1024 * 1024;

/// Work item handed from admission to the conversion worker.
pub struct BulkConversionMessage {
    pub job_id: JobId,
    pub parameters: ConversionParameters,
    pub images: Vec<SourceImage>,
}

#[derive(Debug, Clone, Copy)]
pub struct BatchLimits {
    pub max_files_per_batch: usize,
    pub max_file_size_bytes: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_files_per_batch: DEFAULT_MAX_FILES_PER_BATCH,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
        }
    }
}

/// Admission side of bulk conversion: validates a batch, records the job and
/// queues it for the worker without waiting for any conversion.
///
/// A queue slot is reserved before the job is recorded, so every stored job
/// has its work queued.
pub struct BulkConversionService {
    job_repository: Arc<dyn JobRepository>,
    sender: mpsc::Sender<BulkConversionMessage>,
    limits: BatchLimits,
}

impl BulkConversionService {
    pub fn new(
        job_repository: Arc<dyn JobRepository>,
        sender: mpsc::Sender<BulkConversionMessage>,
        limits: BatchLimits,
    ) -> Self {
        Self {
            job_repository,
            sender,
            limits,
        }
    }

    pub fn limits(&self) -> BatchLimits {
        self.limits
    }

    #[tracing::instrument(skip(self, images), fields(file_count = images.len(), format = %parameters.output_format))]
    pub async fn start_bulk_conversion(
        &self,
        images: Vec<SourceImage>,
        parameters: ConversionParameters,
    ) -> Result<JobId, BulkConversionError> {
        self.validate_batch(&images)?;

        let permit = self.sender.try_reserve().map_err(|e| {
            match e {
                TrySendError::Full(()) => tracing::warn!("Conversion queue full, rejecting batch"),
                TrySendError::Closed(()) => tracing::error!("Conversion worker unavailable"),
            }
            BulkConversionError::QueueUnavailable
        })?;

        let job = ConversionJob::new(parameters, images.len() as u32);
        let job_id = job.id;

        self.job_repository
            .create(&job)
            .await
            .map_err(BulkConversionError::Repository)?;

        permit.send(BulkConversionMessage {
            job_id,
            parameters,
            images,
        });

        tracing::info!(
            job_id = %job_id,
            file_count = job.file_count,
            "Bulk conversion job enqueued"
        );

        Ok(job_id)
    }

    fn validate_batch(&self, images: &[SourceImage]) -> Result<(), BulkConversionError> {
        if images.is_empty() {
            return Err(BulkConversionError::EmptyBatch);
        }

        if images.len() > self.limits.max_files_per_batch {
            return Err(BulkConversionError::TooManyImages {
                count: images.len(),
                max: self.limits.max_files_per_batch,
            });
        }

        if let Some(image) = images
            .iter()
            .find(|image| image.size() > self.limits.max_file_size_bytes)
        {
            return Err(BulkConversionError::ImageTooLarge {
                filename: image.filename.clone(),
                max_bytes: self.limits.max_file_size_bytes,
            });
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BulkConversionError {
    #[error("no images uploaded")]
    EmptyBatch,
    #[error("invalid parameters: {0}")]
    InvalidParameters(#[from] ParameterError),
    #[error("too many images: {count} uploaded, at most {max} allowed")]
    TooManyImages { count: usize, max: usize },
    #[error("image {filename} exceeds the {max_bytes} byte limit")]
    ImageTooLarge { filename: String, max_bytes: usize },
    #[error("conversion queue full or unavailable")]
    QueueUnavailable,
    #[error("repository: {0}")]
    Repository(RepositoryError),
}
