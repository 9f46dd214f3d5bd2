//! Video upload and processing handlers.

use axum::extract::{Multipart, State};
use axum::Json;
use tracing::info;

use sightline_models::{VideoId, VideoProcessingReport};

use crate::error::{ApiError, ApiResult};
use crate::security::is_valid_upload_filename;
use crate::state::AppState;

/// Accept one uploaded video, run the detection pipeline over it, and
/// return the processing report.
///
/// The upload is a multipart form with the file under the `video`
/// field. The filename's stem becomes the video identifier; uploading
/// the same filename again replaces the previous run's frames.
pub async fn process_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<VideoProcessingReport>> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("video") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(|s| s.to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::bad_request("No selected file"))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {e}")))?;
        upload = Some((file_name, data));
        break;
    }
    let (file_name, data) =
        upload.ok_or_else(|| ApiError::bad_request("No video file provided"))?;

    if !is_valid_upload_filename(&file_name) {
        return Err(ApiError::bad_request(format!(
            "Invalid video filename: {file_name}"
        )));
    }
    let video_id = VideoId::from_filename(&file_name)
        .ok_or_else(|| ApiError::bad_request("Video filename has no usable stem"))?;

    let video_path = state.config.upload_dir.join(&file_name);
    tokio::fs::write(&video_path, &data)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to persist upload: {e}")))?;
    info!(video_id = %video_id, bytes = data.len(), "Video uploaded");

    let report = state.pipeline.process(&video_path, &video_id).await?;
    Ok(Json(report))
}
