//! Static serving of annotated frames.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Serve one file from the frame store by its relative path, e.g.
/// `/processed/beach_trip/beach_trip_frame_50.jpg`. Paths escaping the
/// store root are rejected before any filesystem access.
pub async fn serve_frame(
    State(state): State<AppState>,
    Path(frame_path): Path<String>,
) -> ApiResult<Response> {
    let full_path = state.store.resolve(&frame_path)?;

    let bytes = tokio::fs::read(&full_path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::not_found(format!("Frame not found: {frame_path}"))
        } else {
            ApiError::internal(format!("Failed to read frame: {e}"))
        }
    })?;

    Ok(([(header::CONTENT_TYPE, content_type(&frame_path))], bytes).into_response())
}

fn content_type(path: &str) -> &'static str {
    match path.rsplit('.').next() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}
