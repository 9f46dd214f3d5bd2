//! Pipeline and search metrics.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    // Processing metrics
    pub const FRAMES_SAMPLED_TOTAL: &str = "sightline_frames_sampled_total";
    pub const FRAMES_PERSISTED_TOTAL: &str = "sightline_frames_persisted_total";
    pub const DETECTIONS_ACCEPTED_TOTAL: &str = "sightline_detections_accepted_total";
    pub const VIDEOS_PROCESSED_TOTAL: &str = "sightline_videos_processed_total";
    pub const PIPELINE_DURATION_SECONDS: &str = "sightline_pipeline_duration_seconds";

    // Target/search metrics
    pub const TARGETS_REGISTERED_TOTAL: &str = "sightline_targets_registered_total";
    pub const SEARCHES_TOTAL: &str = "sightline_searches_total";
    pub const SEARCH_MATCHES_TOTAL: &str = "sightline_search_matches_total";
    pub const SEARCH_DURATION_SECONDS: &str = "sightline_search_duration_seconds";
}

/// Record frames pulled off the decode pipe during one run.
pub fn record_frames_sampled(count: u64) {
    counter!(names::FRAMES_SAMPLED_TOTAL).increment(count);
}

/// Record one persisted annotated frame.
pub fn record_frame_persisted() {
    counter!(names::FRAMES_PERSISTED_TOTAL).increment(1);
}

/// Record accepted person detections.
pub fn record_detections_accepted(count: u64) {
    counter!(names::DETECTIONS_ACCEPTED_TOTAL).increment(count);
}

/// Record a completed processing run.
pub fn record_video_processed(duration_secs: f64) {
    counter!(names::VIDEOS_PROCESSED_TOTAL).increment(1);
    histogram!(names::PIPELINE_DURATION_SECONDS).record(duration_secs);
}

/// Record a target registration.
pub fn record_target_registered(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::TARGETS_REGISTERED_TOTAL, &labels).increment(1);
}

/// Record a completed search.
pub fn record_search(matches: u64, duration_secs: f64) {
    counter!(names::SEARCHES_TOTAL).increment(1);
    counter!(names::SEARCH_MATCHES_TOTAL).increment(matches);
    histogram!(names::SEARCH_DURATION_SECONDS).record(duration_secs);
}
