use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::application::ports::StagingStoreError;
use crate::application::services::JobStatusError;
use crate::domain::JobId;
use crate::presentation::state::AppState;

use super::error_response::error_response;

/// Serves `/downloads/{job_id}.zip`.
#[tracing::instrument(skip(state))]
pub async fn download_handler(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Response {
    let job_id = match file_name
        .strip_suffix(".zip")
        .unwrap_or(&file_name)
        .parse::<JobId>()
    {
        Ok(id) => id,
        Err(e) => return error_response(StatusCode::NOT_FOUND, e),
    };

    match state.job_status_service.fetch_archive(job_id).await {
        Ok(archive) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/zip".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}.zip\"", job_id),
                ),
            ],
            archive,
        )
            .into_response(),
        Err(JobStatusError::JobNotFound(id)) => {
            error_response(StatusCode::NOT_FOUND, format!("Job not found: {}", id))
        }
        Err(JobStatusError::ArchiveNotReady(status)) => error_response(
            StatusCode::CONFLICT,
            format!("Archive not available, job is {}", status),
        ),
        Err(JobStatusError::Storage(StagingStoreError::NotFound(path))) => {
            tracing::error!(path = %path, "Archive missing from store for completed job");
            error_response(StatusCode::NOT_FOUND, "Archive no longer available")
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to serve archive");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to fetch archive: {}", e),
            )
        }
    }
}
