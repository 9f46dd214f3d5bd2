//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use sightline_engine::EngineError;
use sightline_media::MediaError;
use sightline_vision::VisionError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Processing error: {0}")]
    Engine(#[from] EngineError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Engine(e) => engine_status(e),
            ApiError::Media(e) => media_status(e),
        }
    }
}

/// Malformed requests map to 400, unknown identifiers to 404, inputs
/// the pipeline cannot process to 422, and server-side faults to 500.
fn engine_status(err: &EngineError) -> StatusCode {
    match err {
        EngineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        EngineError::UnknownTarget(_) => StatusCode::NOT_FOUND,
        EngineError::Media(e) => media_status(e),
        EngineError::Vision(e) => vision_status(e),
    }
}

fn media_status(err: &MediaError) -> StatusCode {
    match err {
        MediaError::SecurityViolation(_) => StatusCode::BAD_REQUEST,
        MediaError::Io(_)
        | MediaError::Internal(_)
        | MediaError::JsonParse(_)
        | MediaError::FfmpegNotFound
        | MediaError::FfprobeNotFound => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn vision_status(err: &VisionError) -> StatusCode {
    match err {
        VisionError::EmptyText => StatusCode::BAD_REQUEST,
        VisionError::ModelNotFound(_) | VisionError::Session(_) | VisionError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = if status == StatusCode::INTERNAL_SERVER_ERROR
            && std::env::var("ENVIRONMENT").unwrap_or_default() == "production"
        {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse { detail, code: None };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sightline_models::TargetId;

    #[test]
    fn test_engine_error_status_mapping() {
        assert_eq!(
            engine_status(&EngineError::invalid_input("empty")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            engine_status(&EngineError::UnknownTarget(TargetId::from("text_9"))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            engine_status(&EngineError::Vision(VisionError::inference("bad tensor"))),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            engine_status(&EngineError::Media(MediaError::FfmpegNotFound)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_traversal_attempts_are_bad_requests() {
        assert_eq!(
            media_status(&MediaError::SecurityViolation("..".to_string())),
            StatusCode::BAD_REQUEST
        );
    }
}
