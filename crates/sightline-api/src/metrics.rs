//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "sightline_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "sightline_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "sightline_http_requests_in_flight";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Sanitize path for metrics labels (collapse per-resource segments).
fn sanitize_path(path: &str) -> String {
    // Result lookups carry video and target ids in the path
    let path = regex_lite::Regex::new(r"/get-results/[^/]+/[^/]+")
        .unwrap()
        .replace_all(path, "/get-results/:video_id/:target_id");
    // Served frames carry the full relative frame path
    let path = regex_lite::Regex::new(r"/processed/.+")
        .unwrap()
        .replace_all(&path, "/processed/:frame_path");
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    // Track in-flight requests
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/api/get-results/beach_trip/image_0"),
            "/api/get-results/:video_id/:target_id"
        );
        assert_eq!(
            sanitize_path("/processed/beach_trip/beach_trip_frame_50.jpg"),
            "/processed/:frame_path"
        );
        assert_eq!(sanitize_path("/api/search-targets"), "/api/search-targets");
    }
}
