use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::instrument;

use crate::application::ports::{JobRepository, RepositoryError};
use crate::domain::{ConversionJob, JobId, JobStatus, StatusUpdate};

/// Job store kept in process memory.
///
/// Each update holds the entry's shard lock for the whole check-and-apply, so
/// concurrent updates to one job never interleave.
#[derive(Default)]
pub struct InMemoryJobRepository {
    jobs: DashMap<JobId, ConversionJob>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    async fn create(&self, job: &ConversionJob) -> Result<(), RepositoryError> {
        match self.jobs.entry(job.id) {
            Entry::Occupied(_) => Err(RepositoryError::ConstraintViolation(format!(
                "job {} already exists",
                job.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(job.clone());
                Ok(())
            }
        }
    }

    async fn get_by_id(&self, id: JobId) -> Result<Option<ConversionJob>, RepositoryError> {
        Ok(self.jobs.get(&id).map(|job| job.value().clone()))
    }

    #[instrument(skip(self, update), fields(job_id = %id, status = %update.status()))]
    async fn update_status(
        &self,
        id: JobId,
        update: StatusUpdate,
    ) -> Result<ConversionJob, RepositoryError> {
        let mut job = self
            .jobs
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;

        let from = job.status;
        if !job.apply(&update) {
            return Err(RepositoryError::InvalidTransition {
                job_id: id.to_string(),
                from: from.to_string(),
                to: update.status().to_string(),
            });
        }

        Ok(job.value().clone())
    }

    async fn list_by_status(
        &self,
        status: JobStatus,
    ) -> Result<Vec<ConversionJob>, RepositoryError> {
        let mut jobs: Vec<ConversionJob> = self
            .jobs
            .iter()
            .filter(|entry| entry.status == status)
            .map(|entry| entry.value().clone())
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }
}
