//! Similarity search handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use sightline_models::{SearchResults, TargetId, VideoId, VideoMatches};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub video_ids: Vec<VideoId>,
    #[serde(default)]
    pub target_ids: Vec<TargetId>,
}

/// Search the given videos for the given targets. Videos and targets
/// with no match above the threshold are omitted from the response.
pub async fn search_targets(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Json<SearchResults>> {
    let results = state
        .search
        .search(&request.video_ids, &request.target_ids)
        .await?;
    Ok(Json(results))
}

/// Return the cached matches from the last search of one
/// (video, target) pair, or an empty object if the pair has never
/// been searched or never matched.
pub async fn get_results(
    State(state): State<AppState>,
    Path((video_id, target_id)): Path<(String, String)>,
) -> Json<VideoMatches> {
    let video_id = VideoId::from(video_id);
    let target_id = TargetId::from(target_id);

    let mut results = VideoMatches::new();
    if let Some(matches) = state.cache.get(&video_id, &target_id) {
        results.insert(target_id, matches);
    }
    Json(results)
}
