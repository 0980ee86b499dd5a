use async_trait::async_trait;

use crate::domain::{ConversionJob, JobId, JobStatus, StatusUpdate};

use super::RepositoryError;

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create(&self, job: &ConversionJob) -> Result<(), RepositoryError>;

    async fn get_by_id(&self, id: JobId) -> Result<Option<ConversionJob>, RepositoryError>;

    /// Applies `update` atomically and returns the resulting snapshot.
    ///
    /// Fails with [`RepositoryError::NotFound`] for an unknown id and with
    /// [`RepositoryError::InvalidTransition`] when the job is terminal or the
    /// update would move it backwards.
    async fn update_status(
        &self,
        id: JobId,
        update: StatusUpdate,
    ) -> Result<ConversionJob, RepositoryError>;

    async fn list_by_status(&self, status: JobStatus)
    -> Result<Vec<ConversionJob>, RepositoryError>;
}
