//! Similarity search result models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::target::TargetId;
use crate::video::VideoId;

/// One frame that matched a target above the similarity threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MatchResult {
    /// Zero-based index of the matching frame in the source video
    #[serde(rename = "frame_idx")]
    pub frame_index: u64,

    /// Cosine similarity between frame and target embeddings
    pub similarity: f32,

    /// Frame location relative to the frame store root (`{video_id}/{file}`)
    pub frame_path: String,
}

/// Matches for a single video, keyed by target. Targets with no matches
/// are omitted entirely.
pub type VideoMatches = BTreeMap<TargetId, Vec<MatchResult>>;

/// Full search response: per-video, per-target match lists. Videos with
/// no matching targets are omitted entirely. BTreeMap keeps the wire
/// output deterministic.
pub type SearchResults = BTreeMap<VideoId, VideoMatches>;

/// Composite cache key for one (video, target) search pairing.
///
/// Both components participate in equality and hashing, so results for
/// one pairing can never be read back under another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct SearchKey {
    pub video_id: VideoId,
    pub target_id: TargetId,
}

impl SearchKey {
    pub fn new(video_id: VideoId, target_id: TargetId) -> Self {
        Self {
            video_id,
            target_id,
        }
    }
}

impl fmt::Display for SearchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.video_id, self.target_id)
    }
}
