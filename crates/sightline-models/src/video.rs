//! Video identity and processing report models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::frame::FrameRecord;

/// Unique identifier for an ingested video, derived from the uploaded
/// filename with its extension stripped. Two uploads with the same
/// filename share an identity and the later one overwrites the earlier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Derive the identifier from an uploaded filename (stem without extension).
    ///
    /// Returns `None` when the filename has no usable stem (empty, or a
    /// bare extension like `".mp4"` whose stem is hidden-file-ish).
    pub fn from_filename(filename: &str) -> Option<Self> {
        let stem = Path::new(filename).file_stem()?.to_str()?;
        if stem.is_empty() {
            return None;
        }
        Some(Self(stem.to_string()))
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Summary returned after a full pass over an uploaded video.
///
/// `total_frames` counts every decoded frame, not just the sampled ones,
/// and `frames` holds one record per sampled frame that produced at least
/// one accepted person detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoProcessingReport {
    /// Identifier of the processed video
    pub video_id: VideoId,

    /// Total number of frames in the source video
    pub total_frames: u64,

    /// Source frame rate (frames per second)
    pub fps: f64,

    /// Records for sampled frames containing accepted detections
    #[serde(rename = "frames_with_detections")]
    pub frames: Vec<FrameRecord>,
}

impl VideoProcessingReport {
    /// Number of persisted frames with detections.
    pub fn detection_frame_count(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_id_from_filename_strips_extension() {
        assert_eq!(
            VideoId::from_filename("interview.mp4"),
            Some(VideoId::from_string("interview"))
        );
        assert_eq!(
            VideoId::from_filename("clip.002.mkv"),
            Some(VideoId::from_string("clip.002"))
        );
        assert_eq!(
            VideoId::from_filename("no_extension"),
            Some(VideoId::from_string("no_extension"))
        );
    }

    #[test]
    fn video_id_from_filename_rejects_empty() {
        assert_eq!(VideoId::from_filename(""), None);
    }

    #[test]
    fn report_serializes_frames_under_wire_key() {
        let report = VideoProcessingReport {
            video_id: VideoId::from_string("demo"),
            total_frames: 300,
            fps: 30.0,
            frames: vec![],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["video_id"], "demo");
        assert_eq!(json["total_frames"], 300);
        assert!(json.get("frames_with_detections").is_some());
        assert!(json.get("frames").is_none());
    }
}
