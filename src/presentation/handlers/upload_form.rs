use axum::extract::Multipart;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::domain::{ACCEPTED_CONTENT_TYPES, SourceImage};

use super::error_response::error_response;

/// Images and conversion fields read from a multipart upload.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub images: Vec<SourceImage>,
    pub output_format: Option<String>,
    pub quality: Option<String>,
    pub compression: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Failed to read multipart: {0}")]
    Multipart(String),
    #[error("Unsupported content type: {content_type}. Accepted: {accepted}")]
    UnsupportedMediaType {
        content_type: String,
        accepted: String,
    },
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = match self {
            UploadError::Multipart(_) => StatusCode::BAD_REQUEST,
            UploadError::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        };
        error_response(status, self.to_string())
    }
}

/// Every field carrying a file name is an image; the rest are form values.
pub async fn read_upload_form(multipart: &mut Multipart) -> Result<UploadForm, UploadError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::Multipart(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(filename) = field.file_name().map(str::to_string) {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            if !SourceImage::is_accepted_content_type(&content_type) {
                tracing::warn!(content_type = %content_type, filename = %filename, "Rejected upload");
                return Err(UploadError::UnsupportedMediaType {
                    content_type,
                    accepted: ACCEPTED_CONTENT_TYPES.join(", "),
                });
            }

            let data = field
                .bytes()
                .await
                .map_err(|e| UploadError::Multipart(e.to_string()))?;
            tracing::debug!(filename = %filename, bytes = data.len(), "Image received");
            form.images.push(SourceImage::new(filename, content_type, data));
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| UploadError::Multipart(e.to_string()))?;
        match name.as_str() {
            "outputFormat" | "output_format" | "format" => form.output_format = Some(value),
            "quality" => form.quality = Some(value),
            "compression" => form.compression = Some(value),
            other => tracing::debug!(field = %other, "Ignoring unknown form field"),
        }
    }

    Ok(form)
}
