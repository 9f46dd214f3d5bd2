//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::frames::serve_frame;
use crate::handlers::health::{health, ready};
use crate::handlers::search::{get_results, search_targets};
use crate::handlers::targets::add_target;
use crate::handlers::videos::process_video;
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let api_routes = Router::new()
        // Upload a video and run detection over it
        .route("/process-video", post(process_video))
        // Register an image or text search target
        .route("/add-target", post(add_target))
        // Cross-modal similarity search
        .route("/search-targets", post(search_targets))
        // Cached results for one (video, target) pair
        .route("/get-results/:video_id/:target_id", get(get_results))
        .route("/health", get(health));

    // Annotated frames by relative path under the store root
    let frame_routes = Router::new().route("/processed/*frame_path", get(serve_frame));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(frame_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        // Uploads are whole videos, so both the extractor's limit and
        // the request body cap must allow the configured size
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
