use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::services::{JobStatusError, JobStatusView};
use crate::domain::{JobId, JobStatus};
use crate::presentation::state::AppState;

use super::error_response::error_response;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkStatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub file_count: u32,
    pub converted_count: u32,
    pub failed_count: u32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<JobStatusView> for BulkStatusResponse {
    fn from(view: JobStatusView) -> Self {
        Self {
            job_id: view.job_id.to_string(),
            status: view.status,
            download_url: view.download_url,
            error_message: view.error_message,
            file_count: view.file_count,
            converted_count: view.converted_count,
            failed_count: view.failed_count,
            created_at: view.created_at.to_rfc3339(),
            updated_at: view.updated_at.to_rfc3339(),
        }
    }
}

#[tracing::instrument(skip(state))]
pub async fn bulk_status_handler(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Response {
    let job_id = match job_id.parse::<JobId>() {
        Ok(id) => id,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    match state.job_status_service.get_status(job_id).await {
        Ok(view) => (StatusCode::OK, Json(BulkStatusResponse::from(view))).into_response(),
        Err(JobStatusError::JobNotFound(id)) => {
            error_response(StatusCode::NOT_FOUND, format!("Job not found: {}", id))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch job status");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to fetch job: {}", e),
            )
        }
    }
}
