//! Target registration handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use sightline_models::{TargetId, TargetSource};

use crate::error::{ApiError, ApiResult};
use crate::security::sanitize_target_name;
use crate::state::AppState;

/// Target registration request. The source is tagged: `{"type":
/// "image", "data": "<server-side path>"}` or `{"type": "text",
/// "data": "<description>"}`.
#[derive(Debug, Deserialize)]
pub struct AddTargetRequest {
    #[serde(flatten)]
    pub source: TargetSource,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct AddTargetResponse {
    pub target_id: TargetId,
}

/// Register a search target and return its assigned identifier.
pub async fn add_target(
    State(state): State<AppState>,
    Json(request): Json<AddTargetRequest>,
) -> ApiResult<Json<AddTargetResponse>> {
    let name = sanitize_target_name(&request.name);
    if name.is_empty() {
        return Err(ApiError::bad_request("Target name must not be empty"));
    }

    // Embedding the source runs model inference; keep it off the
    // async runtime's worker threads.
    let registry = Arc::clone(&state.registry);
    let target = tokio::task::spawn_blocking(move || registry.add(request.source, name))
        .await
        .map_err(|e| ApiError::internal(format!("Registration task failed: {e}")))??;

    info!(target_id = %target.id, name = %target.name, "Target added");
    Ok(Json(AddTargetResponse {
        target_id: target.id,
    }))
}
