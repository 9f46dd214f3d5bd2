//! Shared data models for the Sightline backend.
//!
//! This crate provides Serde-serializable types for:
//! - Video identifiers and processing reports
//! - Person detections and bounding boxes
//! - Persisted frame records and manifests
//! - Search targets and their embeddings
//! - Similarity search results

pub mod detection;
pub mod embedding;
pub mod frame;
pub mod search;
pub mod target;
pub mod video;

// Re-export common types
pub use detection::{BoundingBox, Detection, PERSON_LABEL};
pub use embedding::Embedding;
pub use frame::{FrameRecord, VideoManifest, MANIFEST_FILE_NAME};
pub use search::{MatchResult, SearchKey, SearchResults, VideoMatches};
pub use target::{Target, TargetId, TargetKind, TargetSource};
pub use video::{VideoId, VideoProcessingReport};
