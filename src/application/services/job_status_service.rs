use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::application::ports::{JobRepository, RepositoryError, StagingStore, StagingStoreError};
use crate::domain::{ConversionJob, JobId, JobStatus, StoragePath};

/// What a polling client learns about a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatusView {
    pub job_id: JobId,
    pub status: JobStatus,
    pub download_url: Option<String>,
    pub error_message: Option<String>,
    pub file_count: u32,
    pub converted_count: u32,
    pub failed_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Read-only queries over conversion jobs and their archives.
pub struct JobStatusService {
    job_repository: Arc<dyn JobRepository>,
    archive_store: Arc<dyn StagingStore>,
    public_base_url: String,
}

impl JobStatusService {
    pub fn new(
        job_repository: Arc<dyn JobRepository>,
        archive_store: Arc<dyn StagingStore>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            job_repository,
            archive_store,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn download_url(&self, job_id: JobId) -> String {
        format!("{}/downloads/{}.zip", self.public_base_url, job_id)
    }

    #[tracing::instrument(skip(self), fields(job_id = %job_id))]
    pub async fn get_status(&self, job_id: JobId) -> Result<JobStatusView, JobStatusError> {
        let job = self.find(job_id).await?;

        let download_url = match job.status {
            JobStatus::Completed => Some(self.download_url(job.id)),
            _ => None,
        };
        let error_message = match job.status {
            JobStatus::Failed => job
                .error_message
                .or_else(|| Some("bulk conversion failed".to_string())),
            _ => None,
        };

        Ok(JobStatusView {
            job_id: job.id,
            status: job.status,
            download_url,
            error_message,
            file_count: job.file_count,
            converted_count: job.converted_count,
            failed_count: job.failed_count,
            created_at: job.created_at,
            updated_at: job.updated_at,
        })
    }

    #[tracing::instrument(skip(self), fields(job_id = %job_id))]
    pub async fn fetch_archive(&self, job_id: JobId) -> Result<Vec<u8>, JobStatusError> {
        let job = self.find(job_id).await?;

        let archive_ref = match (job.status, job.archive_ref) {
            (JobStatus::Completed, Some(archive_ref)) => archive_ref,
            (status, _) => return Err(JobStatusError::ArchiveNotReady(status)),
        };

        self.archive_store
            .fetch(&StoragePath::from_raw(archive_ref))
            .await
            .map_err(JobStatusError::Storage)
    }

    async fn find(&self, job_id: JobId) -> Result<ConversionJob, JobStatusError> {
        self.job_repository
            .get_by_id(job_id)
            .await
            .map_err(JobStatusError::Repository)?
            .ok_or(JobStatusError::JobNotFound(job_id))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JobStatusError {
    #[error("job not found: {0}")]
    JobNotFound(JobId),
    #[error("archive not ready, job is {0}")]
    ArchiveNotReady(JobStatus),
    #[error("repository: {0}")]
    Repository(RepositoryError),
    #[error("archive store: {0}")]
    Storage(StagingStoreError),
}
