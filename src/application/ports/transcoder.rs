use async_trait::async_trait;

use crate::domain::ConversionParameters;

/// Converts one encoded image into the format described by `parameters`.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn convert(
        &self,
        data: &[u8],
        parameters: &ConversionParameters,
    ) -> Result<Vec<u8>, TranscoderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TranscoderError {
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("unsupported input: {0}")]
    Unsupported(String),
    #[error("transcoding task failed: {0}")]
    Task(String),
}
