use std::sync::Arc;

use async_trait::async_trait;
use image::codecs::avif::AvifEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use tokio::sync::Semaphore;

use crate::application::ports::{Transcoder, TranscoderError};
use crate::application::services::{DEFAULT_MAX_CONCURRENT_JOBS, DEFAULT_MAX_PARALLEL_CONVERSIONS};
use crate::domain::{CompressionLevel, ConversionParameters, OutputFormat};

const ACCEPTED_INPUTS: [ImageFormat; 4] = [
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::WebP,
    ImageFormat::Avif,
];

/// Transcoder backed by the `image` crate for decoding and AVIF output and
/// libwebp for lossy WebP output. Decoding and encoding run on the blocking
/// thread pool.
///
/// A slot is held until the blocking work returns, not until the caller stops
/// waiting, so a timed-out conversion keeps its slot while it still burns CPU.
#[derive(Debug, Clone)]
pub struct ImageTranscoder {
    slots: Arc<Semaphore>,
}

impl Default for ImageTranscoder {
    fn default() -> Self {
        Self::with_max_in_flight(DEFAULT_MAX_CONCURRENT_JOBS * DEFAULT_MAX_PARALLEL_CONVERSIONS)
    }
}

impl ImageTranscoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_in_flight(max_in_flight: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    #[cfg(test)]
    fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }
}

#[async_trait]
impl Transcoder for ImageTranscoder {
    async fn convert(
        &self,
        data: &[u8],
        parameters: &ConversionParameters,
    ) -> Result<Vec<u8>, TranscoderError> {
        let data = data.to_vec();
        let parameters = *parameters;

        let slot = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|e| TranscoderError::Task(e.to_string()))?;

        tokio::task::spawn_blocking(move || {
            let _slot = slot;
            transcode(&data, &parameters)
        })
        .await
        .map_err(|e| TranscoderError::Task(e.to_string()))?
    }
}

pub fn transcode(data: &[u8], parameters: &ConversionParameters) -> Result<Vec<u8>, TranscoderError> {
    let format = image::guess_format(data)
        .map_err(|e| TranscoderError::Unsupported(e.to_string()))?;
    if !ACCEPTED_INPUTS.contains(&format) {
        return Err(TranscoderError::Unsupported(format!(
            "input format {:?} is not accepted",
            format
        )));
    }

    let decoded = image::load_from_memory_with_format(data, format)
        .map_err(|e| TranscoderError::Decode(e.to_string()))?;
    let rgba = decoded.to_rgba8();

    match parameters.output_format {
        OutputFormat::WebP => encode_webp(&rgba, parameters),
        OutputFormat::Avif => encode_avif(rgba, parameters),
    }
}

fn encode_webp(rgba: &RgbaImage, parameters: &ConversionParameters) -> Result<Vec<u8>, TranscoderError> {
    let mut config = webp::WebPConfig::new()
        .map_err(|_| TranscoderError::Encode("could not initialise WebP encoder config".to_string()))?;
    config.lossless = 0;
    config.quality = f32::from(parameters.quality.value());
    config.method = webp_method(parameters.compression);

    let encoded = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height())
        .encode_advanced(&config)
        .map_err(|e| TranscoderError::Encode(format!("WebP encoding failed: {:?}", e)))?;

    Ok(encoded.to_vec())
}

fn encode_avif(rgba: RgbaImage, parameters: &ConversionParameters) -> Result<Vec<u8>, TranscoderError> {
    let mut output = Vec::new();
    DynamicImage::ImageRgba8(rgba)
        .write_with_encoder(AvifEncoder::new_with_speed_quality(
            &mut output,
            avif_speed(parameters.compression),
            parameters.quality.value(),
        ))
        .map_err(|e| TranscoderError::Encode(e.to_string()))?;

    Ok(output)
}

/// libwebp method runs from 0 (fastest) to 6 (smallest output).
fn webp_method(compression: CompressionLevel) -> i32 {
    i32::from(compression.effort()) * 6 / 9
}

/// AVIF encoder speed runs from 1 (slowest, smallest) to 10 (fastest).
fn avif_speed(compression: CompressionLevel) -> u8 {
    11 - compression.effort()
}
