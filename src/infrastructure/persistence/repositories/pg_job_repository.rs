use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use crate::application::ports::{JobRepository, RepositoryError};
use crate::domain::{
    CompressionLevel, ConversionJob, ConversionParameters, JobId, JobStatus, OutputFormat,
    Quality, StatusUpdate,
};

const JOB_COLUMNS: &str = "id, status, output_format, quality, compression, file_count, \
     converted_count, failed_count, error_message, archive_ref, created_at, updated_at";

const ALL_STATUSES: [JobStatus; 4] = [
    JobStatus::Pending,
    JobStatus::Processing,
    JobStatus::Completed,
    JobStatus::Failed,
];

#[derive(Clone)]
pub struct PgJobRepository {
    pool: PgPool,
}

impl PgJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    async fn create(&self, job: &ConversionJob) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO conversion_jobs
                (id, status, output_format, quality, compression, file_count,
                 converted_count, failed_count, error_message, archive_ref, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(job.status.as_str())
        .bind(job.parameters.output_format.as_str())
        .bind(i16::from(job.parameters.quality.value()))
        .bind(job.parameters.compression.as_str())
        .bind(job.file_count as i32)
        .bind(job.converted_count as i32)
        .bind(job.failed_count as i32)
        .bind(job.error_message.as_deref())
        .bind(job.archive_ref.as_deref())
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::ConstraintViolation(db.to_string())
            }
            other => RepositoryError::QueryFailed(other.to_string()),
        })?;

        Ok(())
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn get_by_id(&self, id: JobId) -> Result<Option<ConversionJob>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM conversion_jobs WHERE id = $1",
            JOB_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        row.as_ref().map(job_from_row).transpose()
    }

    #[instrument(skip(self, update), fields(job_id = %id, status = %update.status()))]
    async fn update_status(
        &self,
        id: JobId,
        update: StatusUpdate,
    ) -> Result<ConversionJob, RepositoryError> {
        let target = update.status();
        let allowed_from: Vec<&str> = ALL_STATUSES
            .iter()
            .filter(|from| from.can_transition_to(target))
            .map(|from| from.as_str())
            .collect();

        let (error_message, archive_ref, converted, failed) = match &update {
            StatusUpdate::Processing => (None, None, None, None),
            StatusUpdate::Completed {
                archive_ref,
                converted,
                failed,
            } => (
                None,
                Some(archive_ref.as_str()),
                Some(*converted as i32),
                Some(*failed as i32),
            ),
            StatusUpdate::Failed {
                error_message,
                converted,
                failed,
            } => (
                Some(error_message.as_str()),
                None,
                Some(*converted as i32),
                Some(*failed as i32),
            ),
        };

        // Single conditional statement: the row lock serializes writers and
        // the status filter rejects illegal transitions.
        let row = sqlx::query(&format!(
            r#"
            UPDATE conversion_jobs
            SET status = $2,
                error_message = $3,
                archive_ref = $4,
                converted_count = COALESCE($5, converted_count),
                failed_count = COALESCE($6, failed_count),
                updated_at = $7
            WHERE id = $1 AND status = ANY($8)
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(id.as_uuid())
        .bind(target.as_str())
        .bind(error_message)
        .bind(archive_ref)
        .bind(converted)
        .bind(failed)
        .bind(Utc::now())
        .bind(allowed_from)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        if let Some(row) = row {
            return job_from_row(&row);
        }

        match self.get_by_id(id).await? {
            Some(current) => Err(RepositoryError::InvalidTransition {
                job_id: id.to_string(),
                from: current.status.to_string(),
                to: target.to_string(),
            }),
            None => Err(RepositoryError::NotFound(id.to_string())),
        }
    }

    #[instrument(skip(self), fields(status = %status))]
    async fn list_by_status(
        &self,
        status: JobStatus,
    ) -> Result<Vec<ConversionJob>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM conversion_jobs WHERE status = $1 ORDER BY created_at DESC",
            JOB_COLUMNS
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        rows.iter().map(job_from_row).collect()
    }
}

fn job_from_row(row: &PgRow) -> Result<ConversionJob, RepositoryError> {
    let column_error = |e: sqlx::Error| RepositoryError::QueryFailed(e.to_string());

    let id: Uuid = row.try_get("id").map_err(column_error)?;
    let status: String = row.try_get("status").map_err(column_error)?;
    let output_format: String = row.try_get("output_format").map_err(column_error)?;
    let quality: i16 = row.try_get("quality").map_err(column_error)?;
    let compression: String = row.try_get("compression").map_err(column_error)?;
    let file_count: i32 = row.try_get("file_count").map_err(column_error)?;
    let converted_count: i32 = row.try_get("converted_count").map_err(column_error)?;
    let failed_count: i32 = row.try_get("failed_count").map_err(column_error)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(column_error)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(column_error)?;

    let parameters = ConversionParameters::new(
        output_format
            .parse::<OutputFormat>()
            .map_err(RepositoryError::QueryFailed)?,
        Quality::new(i64::from(quality)).map_err(RepositoryError::QueryFailed)?,
        compression
            .parse::<CompressionLevel>()
            .map_err(RepositoryError::QueryFailed)?,
    );

    Ok(ConversionJob {
        id: JobId::from_uuid(id),
        status: status
            .parse::<JobStatus>()
            .map_err(RepositoryError::QueryFailed)?,
        parameters,
        file_count: file_count.max(0) as u32,
        converted_count: converted_count.max(0) as u32,
        failed_count: failed_count.max(0) as u32,
        error_message: row.try_get("error_message").map_err(column_error)?,
        archive_ref: row.try_get("archive_ref").map_err(column_error)?,
        created_at,
        updated_at,
    })
}
