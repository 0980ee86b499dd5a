use chrono::{DateTime, Utc};

use super::{ConversionParameters, JobId, JobStatus};

#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub id: JobId,
    pub status: JobStatus,
    pub parameters: ConversionParameters,
    pub file_count: u32,
    pub converted_count: u32,
    pub failed_count: u32,
    pub error_message: Option<String>,
    pub archive_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversionJob {
    /// A freshly admitted job. Work is dispatched right after creation, so jobs
    /// start out `processing`.
    pub fn new(parameters: ConversionParameters, file_count: u32) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            status: JobStatus::Processing,
            parameters,
            file_count,
            converted_count: 0,
            failed_count: 0,
            error_message: None,
            archive_ref: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies `update` if the status transition is legal. Returns `false` and
    /// leaves the job untouched otherwise.
    pub fn apply(&mut self, update: &StatusUpdate) -> bool {
        if !self.status.can_transition_to(update.status()) {
            return false;
        }

        self.status = update.status();
        match update {
            StatusUpdate::Processing => {}
            StatusUpdate::Completed {
                archive_ref,
                converted,
                failed,
            } => {
                self.archive_ref = Some(archive_ref.clone());
                self.error_message = None;
                self.converted_count = *converted;
                self.failed_count = *failed;
            }
            StatusUpdate::Failed {
                error_message,
                converted,
                failed,
            } => {
                self.error_message = Some(error_message.clone());
                self.archive_ref = None;
                self.converted_count = *converted;
                self.failed_count = *failed;
            }
        }
        self.updated_at = Utc::now();
        true
    }
}

/// A status transition together with the payload its target status carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    Processing,
    Completed {
        archive_ref: String,
        converted: u32,
        failed: u32,
    },
    Failed {
        error_message: String,
        converted: u32,
        failed: u32,
    },
}

impl StatusUpdate {
    pub fn failed(error_message: impl Into<String>) -> Self {
        StatusUpdate::Failed {
            error_message: error_message.into(),
            converted: 0,
            failed: 0,
        }
    }

    pub fn status(&self) -> JobStatus {
        match self {
            StatusUpdate::Processing => JobStatus::Processing,
            StatusUpdate::Completed { .. } => JobStatus::Completed,
            StatusUpdate::Failed { .. } => JobStatus::Failed,
        }
    }
}
