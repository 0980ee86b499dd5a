use serde::Serialize;

use super::{CompressionLevel, OutputFormat, Quality};

/// Uniform parameters applied to every image of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConversionParameters {
    pub output_format: OutputFormat,
    pub quality: Quality,
    pub compression: CompressionLevel,
}

impl ConversionParameters {
    pub fn new(output_format: OutputFormat, quality: Quality, compression: CompressionLevel) -> Self {
        Self {
            output_format,
            quality,
            compression,
        }
    }

    /// Validates raw form values. Quality and compression fall back to their
    /// defaults when absent or blank; the output format is mandatory.
    pub fn parse(
        output_format: Option<&str>,
        quality: Option<&str>,
        compression: Option<&str>,
    ) -> Result<Self, ParameterError> {
        let output_format = match non_blank(output_format) {
            Some(raw) => raw
                .parse::<OutputFormat>()
                .map_err(ParameterError::OutputFormat)?,
            None => return Err(ParameterError::MissingOutputFormat),
        };

        let quality = match non_blank(quality) {
            Some(raw) => {
                let value = raw
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| ParameterError::Quality(format!("Quality is not an integer: {}", raw)))?;
                Quality::new(value).map_err(ParameterError::Quality)?
            }
            None => Quality::default(),
        };

        let compression = match non_blank(compression) {
            Some(raw) => raw
                .parse::<CompressionLevel>()
                .map_err(ParameterError::Compression)?,
            None => CompressionLevel::default(),
        };

        Ok(Self::new(output_format, quality, compression))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParameterError {
    #[error("output format is required")]
    MissingOutputFormat,
    #[error("{0}")]
    OutputFormat(String),
    #[error("{0}")]
    Quality(String),
    #[error("{0}")]
    Compression(String),
}
