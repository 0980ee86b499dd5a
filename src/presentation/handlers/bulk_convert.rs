use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::services::BulkConversionError;
use crate::domain::{ConversionParameters, JobId};
use crate::presentation::state::AppState;

use super::error_response::error_response;
use super::upload_form::{UploadForm, read_upload_form};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkConvertResponse {
    pub job_id: String,
    pub message: String,
}

#[tracing::instrument(skip(state, multipart))]
pub async fn bulk_convert_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Response {
    let form = match read_upload_form(&mut multipart).await {
        Ok(form) => form,
        Err(e) => return e.into_response(),
    };

    match admit(&state, form).await {
        Ok(job_id) => (
            StatusCode::ACCEPTED,
            Json(BulkConvertResponse {
                job_id: job_id.to_string(),
                message: "Bulk conversion started".to_string(),
            }),
        )
            .into_response(),
        Err(e) => bulk_error_response(e),
    }
}

async fn admit(state: &AppState, form: UploadForm) -> Result<JobId, BulkConversionError> {
    if form.images.is_empty() {
        return Err(BulkConversionError::EmptyBatch);
    }

    let parameters = ConversionParameters::parse(
        form.output_format.as_deref(),
        form.quality.as_deref(),
        form.compression.as_deref(),
    )?;

    state
        .bulk_conversion_service
        .start_bulk_conversion(form.images, parameters)
        .await
}

fn bulk_error_response(error: BulkConversionError) -> Response {
    let status = match &error {
        BulkConversionError::EmptyBatch
        | BulkConversionError::InvalidParameters(_)
        | BulkConversionError::TooManyImages { .. }
        | BulkConversionError::ImageTooLarge { .. } => {
            tracing::warn!(error = %error, "Bulk conversion rejected");
            StatusCode::BAD_REQUEST
        }
        BulkConversionError::QueueUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        BulkConversionError::Repository(e) => {
            tracing::error!(error = %e, "Failed to create bulk conversion job");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    error_response(status, error.to_string())
}
