use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::infrastructure::observability::request_id_middleware;
use crate::presentation::handlers::{
    bulk_convert_handler, bulk_status_handler, convert_handler, download_handler, health_handler,
};
use crate::presentation::state::AppState;

/// Room for multipart boundaries and form fields on top of the image bytes.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    let limits = state.bulk_conversion_service.limits();
    let body_limit = limits
        .max_files_per_batch
        .saturating_mul(limits.max_file_size_bytes)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/health", get(health_handler))
        .route("/convert", post(convert_handler))
        .route("/bulk-convert", post(bulk_convert_handler))
        .route("/bulk-convert/status/{job_id}", get(bulk_status_handler))
        .route("/downloads/{file_name}", get(download_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}
