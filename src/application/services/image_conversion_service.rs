use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::{Transcoder, TranscoderError};
use crate::domain::{ConversionParameters, SourceImage};

pub struct ConvertedImage {
    pub filename: String,
    pub content_type: &'static str,
    pub data: Vec<u8>,
}

/// Synchronous conversion of a single uploaded image.
pub struct ImageConversionService {
    transcoder: Arc<dyn Transcoder>,
    timeout: Duration,
}

impl ImageConversionService {
    pub fn new(transcoder: Arc<dyn Transcoder>, timeout: Duration) -> Self {
        Self {
            transcoder,
            timeout,
        }
    }

    #[tracing::instrument(skip(self, image), fields(filename = %image.filename, bytes = image.size()))]
    pub async fn convert(
        &self,
        image: &SourceImage,
        parameters: &ConversionParameters,
    ) -> Result<ConvertedImage, ConversionError> {
        if image.data.is_empty() {
            return Err(ConversionError::EmptyImage);
        }

        let data = tokio::time::timeout(self.timeout, self.transcoder.convert(&image.data, parameters))
            .await
            .map_err(|_| ConversionError::Timeout(self.timeout))??;

        tracing::info!(
            format = %parameters.output_format,
            quality = parameters.quality.value(),
            compression = %parameters.compression,
            output_bytes = data.len(),
            "Image converted"
        );

        Ok(ConvertedImage {
            filename: image.output_filename(parameters.output_format),
            content_type: parameters.output_format.mime_type(),
            data,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("uploaded image is empty")]
    EmptyImage,
    #[error("conversion timed out after {0:?}")]
    Timeout(Duration),
    #[error("transcoding: {0}")]
    Transcoding(#[from] TranscoderError),
}
