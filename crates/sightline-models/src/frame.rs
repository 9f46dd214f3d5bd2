//! Persisted frame records and the per-video manifest.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::detection::Detection;
use crate::video::{VideoId, VideoProcessingReport};

/// File name of the manifest written beside a video's annotated frames.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// One sampled frame that produced at least one accepted person detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FrameRecord {
    /// Zero-based index of the frame in the source video
    #[serde(rename = "frame_idx")]
    pub frame_index: u64,

    /// Presentation time in seconds (`frame_index / fps`)
    pub timestamp: f64,

    /// File name of the annotated JPEG within the video's frame directory
    pub filename: String,

    /// Accepted person detections for this frame
    pub detections: Vec<Detection>,
}

/// Manifest persisted alongside a video's annotated frames.
///
/// The manifest is the authoritative listing of which frames exist and
/// which index each file corresponds to; directory scans are only a
/// fallback for stores written before the manifest existed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoManifest {
    /// Identifier of the processed video
    pub video_id: VideoId,

    /// Source frame rate (frames per second)
    pub fps: f64,

    /// Total number of frames in the source video
    pub total_frames: u64,

    /// When the processing run finished
    pub processed_at: DateTime<Utc>,

    /// Persisted frame records, in ascending frame order
    pub frames: Vec<FrameRecord>,
}

impl VideoManifest {
    /// Build a manifest from a finished processing report.
    pub fn from_report(report: &VideoProcessingReport, processed_at: DateTime<Utc>) -> Self {
        Self {
            video_id: report.video_id.clone(),
            fps: report.fps,
            total_frames: report.total_frames,
            processed_at,
            frames: report.frames.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{BoundingBox, Detection};

    fn sample_record() -> FrameRecord {
        FrameRecord {
            frame_index: 25,
            timestamp: 25.0 / 30.0,
            filename: "demo_frame_25.jpg".to_string(),
            detections: vec![Detection::new(
                BoundingBox::new(10.0, 10.0, 50.0, 90.0),
                0.91,
                "person",
            )],
        }
    }

    #[test]
    fn frame_record_round_trips_through_json() {
        let record = sample_record();
        let json = serde_json::to_string(&record).unwrap();
        let back: FrameRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }

    #[test]
    fn frame_index_uses_wire_name() {
        let json = serde_json::to_value(sample_record()).unwrap();
        assert_eq!(json["frame_idx"], 25);
        assert!(json.get("frame_index").is_none());
    }

    #[test]
    fn manifest_copies_report_fields() {
        let report = VideoProcessingReport {
            video_id: VideoId::from_string("demo"),
            total_frames: 120,
            fps: 24.0,
            frames: vec![sample_record()],
        };
        let manifest = VideoManifest::from_report(&report, Utc::now());
        assert_eq!(manifest.video_id, report.video_id);
        assert_eq!(manifest.total_frames, 120);
        assert_eq!(manifest.frames.len(), 1);
    }
}
