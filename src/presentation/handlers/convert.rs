use axum::extract::{Multipart, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::application::services::ConversionError;
use crate::domain::ConversionParameters;
use crate::presentation::state::AppState;

use super::error_response::error_response;
use super::upload_form::read_upload_form;

const DEFAULT_SINGLE_FORMAT: &str = "webp";

#[tracing::instrument(skip(state, multipart))]
pub async fn convert_handler(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let form = match read_upload_form(&mut multipart).await {
        Ok(form) => form,
        Err(e) => return e.into_response(),
    };

    let Some(image) = form.images.into_iter().next() else {
        tracing::warn!("Convert request with no image");
        return error_response(StatusCode::BAD_REQUEST, "No image uploaded");
    };

    let max_bytes = state.bulk_conversion_service.limits().max_file_size_bytes;
    if image.size() > max_bytes {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("image {} exceeds the {} byte limit", image.filename, max_bytes),
        );
    }

    let parameters = match ConversionParameters::parse(
        form.output_format.as_deref().or(Some(DEFAULT_SINGLE_FORMAT)),
        form.quality.as_deref(),
        form.compression.as_deref(),
    ) {
        Ok(parameters) => parameters,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, format!("invalid parameters: {}", e));
        }
    };

    match state
        .image_conversion_service
        .convert(&image, &parameters)
        .await
    {
        Ok(converted) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, converted.content_type.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", converted.filename),
                ),
            ],
            converted.data,
        )
            .into_response(),
        Err(ConversionError::EmptyImage) => {
            error_response(StatusCode::BAD_REQUEST, ConversionError::EmptyImage.to_string())
        }
        Err(e @ ConversionError::Timeout(_)) => {
            tracing::error!(error = %e, "Image conversion timed out");
            error_response(StatusCode::GATEWAY_TIMEOUT, e.to_string())
        }
        Err(e @ ConversionError::Transcoding(_)) => {
            tracing::warn!(error = %e, "Image conversion failed");
            error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        }
    }
}
