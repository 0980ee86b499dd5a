use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use imagecast::application::services::{ConversionError, ImageConversionService};
use imagecast::domain::{ConversionParameters, SourceImage};
use imagecast::infrastructure::transcoding::ImageTranscoder;

use crate::helpers::{CORRUPT_MARKER, FakeTranscoder, jpeg_bytes, sample_image, webp_parameters};

#[tokio::test]
async fn given_real_jpeg_when_converting_to_webp_then_returns_webp_named_after_upload() {
    let service = ImageConversionService::new(
        Arc::new(ImageTranscoder::new()),
        Duration::from_secs(30),
    );
    let image = SourceImage::new("holiday photo.jpg", "image/jpeg", Bytes::from(jpeg_bytes(8, 8)));

    let converted = service.convert(&image, &webp_parameters()).await.unwrap();

    assert_eq!(converted.filename, "holiday_photo.webp");
    assert_eq!(converted.content_type, "image/webp");
    assert_eq!(&converted.data[0..4], b"RIFF");
    assert_eq!(&converted.data[8..12], b"WEBP");
}

#[tokio::test]
async fn given_avif_parameters_when_converting_then_content_type_is_avif() {
    let service = ImageConversionService::new(Arc::new(FakeTranscoder::new()), Duration::from_secs(1));
    let parameters = ConversionParameters::parse(Some("avif"), Some("60"), Some("low")).unwrap();

    let converted = service
        .convert(&sample_image("cat.png", b"pixels"), &parameters)
        .await
        .unwrap();

    assert_eq!(converted.filename, "cat.avif");
    assert_eq!(converted.content_type, "image/avif");
}

#[tokio::test]
async fn given_empty_upload_when_converting_then_empty_image_error() {
    let service = ImageConversionService::new(Arc::new(FakeTranscoder::new()), Duration::from_secs(1));

    let result = service
        .convert(&sample_image("empty.jpg", b""), &webp_parameters())
        .await;

    assert!(matches!(result, Err(ConversionError::EmptyImage)));
}

#[tokio::test]
async fn given_slow_transcoder_when_converting_then_times_out() {
    let service = ImageConversionService::new(
        Arc::new(FakeTranscoder::with_delay(Duration::from_millis(500))),
        Duration::from_millis(20),
    );

    let result = service
        .convert(&sample_image("slow.jpg", b"data"), &webp_parameters())
        .await;

    assert!(matches!(result, Err(ConversionError::Timeout(_))));
}

#[tokio::test]
async fn given_corrupt_upload_when_converting_then_transcoding_error() {
    let service = ImageConversionService::new(Arc::new(FakeTranscoder::new()), Duration::from_secs(1));

    let result = service
        .convert(&sample_image("bad.jpg", CORRUPT_MARKER), &webp_parameters())
        .await;

    assert!(matches!(result, Err(ConversionError::Transcoding(_))));
}
