use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tokio::sync::mpsc;
use tower::ServiceExt;

use imagecast::application::ports::JobRepository;
use imagecast::application::services::{
    BatchLimits, BulkConversionService, ConversionWorker, ImageConversionService,
    JobStatusService, WorkerConfig,
};
use imagecast::domain::{ConversionJob, JobId};
use imagecast::infrastructure::archive::ZipArchiver;
use imagecast::infrastructure::persistence::InMemoryJobRepository;
use imagecast::infrastructure::transcoding::ImageTranscoder;
use imagecast::presentation::{AppState, create_router};

use crate::helpers::{MemoryStagingStore, job_count, jpeg_bytes, png_bytes, webp_parameters};

const BOUNDARY: &str = "imagecast-test-boundary";
const BASE_URL: &str = "http://localhost:3000";

struct TestApp {
    router: Router,
    repository: Arc<InMemoryJobRepository>,
}

fn create_test_app() -> TestApp {
    let repository = Arc::new(InMemoryJobRepository::new());
    let archives = Arc::new(MemoryStagingStore::new());
    let transcoder = Arc::new(ImageTranscoder::new());

    let (sender, receiver) = mpsc::channel(8);
    let worker = ConversionWorker::new(
        receiver,
        transcoder.clone(),
        Arc::new(ZipArchiver::new()),
        repository.clone(),
        Arc::new(MemoryStagingStore::new()),
        archives.clone(),
        WorkerConfig::default(),
    );
    tokio::spawn(worker.run());

    let state = AppState {
        bulk_conversion_service: Arc::new(BulkConversionService::new(
            repository.clone(),
            sender,
            BatchLimits::default(),
        )),
        job_status_service: Arc::new(JobStatusService::new(
            repository.clone(),
            archives,
            BASE_URL,
        )),
        image_conversion_service: Arc::new(ImageConversionService::new(
            transcoder,
            Duration::from_secs(30),
        )),
    };

    TestApp {
        router: create_router(state),
        repository,
    }
}

/// Hand-built `multipart/form-data` body.
#[derive(Default)]
struct MultipartBody {
    bytes: Vec<u8>,
}

impl MultipartBody {
    fn file(mut self, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.bytes.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"images\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.bytes.extend_from_slice(data);
        self.bytes.extend_from_slice(b"\r\n");
        self
    }

    fn text(mut self, name: &str, value: &str) -> Self {
        self.bytes.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    fn into_request(mut self, uri: &str) -> Request<Body> {
        self.bytes
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(self.bytes))
            .unwrap()
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn poll_until_terminal(app: &TestApp, job_id: &str) -> serde_json::Value {
    for _ in 0..250 {
        let response = app
            .router
            .clone()
            .oneshot(get(&format!("/bulk-convert/status/{job_id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        if json["status"] == "completed" || json["status"] == "failed" {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("job {job_id} did not finish in time");
}

#[tokio::test]
async fn given_running_server_when_health_check_then_returns_healthy() {
    let app = create_test_app();

    let response = app.router.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn given_request_with_id_when_any_endpoint_then_response_echoes_request_id() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "test-request-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "test-request-123"
    );
}

#[tokio::test]
async fn given_request_without_id_when_any_endpoint_then_response_contains_request_id() {
    let app = create_test_app();

    let response = app.router.oneshot(get("/health")).await.unwrap();

    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn given_three_jpegs_when_bulk_converting_then_archive_contains_three_webps() {
    let app = create_test_app();
    let request = MultipartBody::default()
        .file("sunrise.jpg", "image/jpeg", &jpeg_bytes(16, 16))
        .file("sunset.jpg", "image/jpeg", &jpeg_bytes(12, 8))
        .file("sunrise.jpg", "image/jpeg", &jpeg_bytes(8, 12))
        .text("outputFormat", "webp")
        .text("quality", "75")
        .into_request("/bulk-convert");

    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let accepted = json_body(response).await;
    let job_id = accepted["jobId"].as_str().unwrap().to_string();
    assert!(job_id.parse::<JobId>().is_ok());
    assert!(accepted["message"].is_string());

    let status = poll_until_terminal(&app, &job_id).await;
    assert_eq!(status["status"], "completed");
    assert_eq!(status["fileCount"], 3);
    assert_eq!(status["convertedCount"], 3);
    assert_eq!(
        status["downloadUrl"],
        format!("{BASE_URL}/downloads/{job_id}.zip")
    );
    assert!(status.get("errorMessage").is_none());

    let response = app
        .router
        .clone()
        .oneshot(get(&format!("/downloads/{job_id}.zip")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/zip"
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes.to_vec())).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(
        names,
        vec!["000_sunrise.webp", "001_sunset.webp", "002_sunrise.webp"]
    );

    let mut entry = archive.by_name("001_sunset.webp").unwrap();
    let mut data = Vec::new();
    std::io::Read::read_to_end(&mut entry, &mut data).unwrap();
    assert_eq!(&data[0..4], b"RIFF");
}

#[tokio::test]
async fn given_one_corrupt_upload_when_bulk_converting_then_job_completes_partially() {
    let app = create_test_app();
    let request = MultipartBody::default()
        .file("fine.png", "image/png", &png_bytes(8, 8))
        .file("broken.jpg", "image/jpeg", b"definitely not a jpeg")
        .text("outputFormat", "webp")
        .into_request("/bulk-convert");

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let job_id = json_body(response).await["jobId"]
        .as_str()
        .unwrap()
        .to_string();

    let status = poll_until_terminal(&app, &job_id).await;

    assert_eq!(status["status"], "completed");
    assert_eq!(status["convertedCount"], 1);
    assert_eq!(status["failedCount"], 1);
}

#[tokio::test]
async fn given_only_corrupt_uploads_when_bulk_converting_then_status_reports_failure() {
    let app = create_test_app();
    let request = MultipartBody::default()
        .file("broken.jpg", "image/jpeg", b"garbage")
        .text("outputFormat", "avif")
        .into_request("/bulk-convert");

    let response = app.router.clone().oneshot(request).await.unwrap();
    let job_id = json_body(response).await["jobId"]
        .as_str()
        .unwrap()
        .to_string();

    let status = poll_until_terminal(&app, &job_id).await;

    assert_eq!(status["status"], "failed");
    assert!(status.get("downloadUrl").is_none());
    assert!(status["errorMessage"].as_str().unwrap().contains("failed"));

    let response = app
        .router
        .clone()
        .oneshot(get(&format!("/downloads/{job_id}.zip")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn given_no_images_when_bulk_converting_then_bad_request_and_no_job() {
    let app = create_test_app();
    let request = MultipartBody::default()
        .text("outputFormat", "webp")
        .into_request("/bulk-convert");

    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
    assert_eq!(job_count(app.repository.as_ref()).await, 0);
}

#[tokio::test]
async fn given_quality_out_of_range_when_bulk_converting_then_bad_request_and_no_job() {
    let app = create_test_app();
    let request = MultipartBody::default()
        .file("a.jpg", "image/jpeg", &jpeg_bytes(4, 4))
        .text("outputFormat", "webp")
        .text("quality", "150")
        .into_request("/bulk-convert");

    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(job_count(app.repository.as_ref()).await, 0);
}

#[tokio::test]
async fn given_missing_output_format_when_bulk_converting_then_bad_request() {
    let app = create_test_app();
    let request = MultipartBody::default()
        .file("a.jpg", "image/jpeg", &jpeg_bytes(4, 4))
        .into_request("/bulk-convert");

    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn given_unsupported_content_type_when_bulk_converting_then_unsupported_media_type() {
    let app = create_test_app();
    let request = MultipartBody::default()
        .file("notes.txt", "text/plain", b"hello")
        .text("outputFormat", "webp")
        .into_request("/bulk-convert");

    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(job_count(app.repository.as_ref()).await, 0);
}

#[tokio::test]
async fn given_too_many_images_when_bulk_converting_then_bad_request() {
    let app = create_test_app();
    let jpeg = jpeg_bytes(2, 2);
    let mut body = MultipartBody::default();
    for i in 0..=BatchLimits::default().max_files_per_batch {
        body = body.file(&format!("img{i}.jpg"), "image/jpeg", &jpeg);
    }
    let request = body.text("outputFormat", "webp").into_request("/bulk-convert");

    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(job_count(app.repository.as_ref()).await, 0);
}

#[tokio::test]
async fn given_unknown_job_when_polling_status_then_not_found() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(get(&format!("/bulk-convert/status/{}", JobId::new())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn given_malformed_job_id_when_polling_status_then_bad_request() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(get("/bulk-convert/status/not-a-uuid"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn given_processing_job_when_downloading_then_conflict() {
    let app = create_test_app();
    let job = ConversionJob::new(webp_parameters(), 1);
    app.repository.create(&job).await.unwrap();

    let response = app
        .router
        .oneshot(get(&format!("/downloads/{}.zip", job.id)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn given_unknown_job_when_downloading_then_not_found() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(get(&format!("/downloads/{}.zip", JobId::new())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn given_single_png_when_converting_then_returns_webp_attachment() {
    let app = create_test_app();
    let request = MultipartBody::default()
        .file("logo.png", "image/png", &png_bytes(10, 10))
        .text("outputFormat", "webp")
        .into_request("/convert");

    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "image/webp");
    assert_eq!(
        response.headers().get("content-disposition").unwrap(),
        "attachment; filename=\"logo.webp\""
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[8..12], b"WEBP");
}

#[tokio::test]
async fn given_garbage_upload_when_converting_then_unprocessable_entity() {
    let app = create_test_app();
    let request = MultipartBody::default()
        .file("broken.png", "image/png", b"not an image at all")
        .into_request("/convert");

    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
