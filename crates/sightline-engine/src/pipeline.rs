//! Video processing pipeline: sample, detect, annotate, persist.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::io::AsyncRead;
use tracing::{debug, info};

use sightline_media::{probe_video, render_detections, FrameSampler, FrameStore, FrameStream, VideoInfo};
use sightline_models::{Detection, FrameRecord, VideoId, VideoManifest, VideoProcessingReport};
use sightline_vision::PersonDetector;

use crate::error::{EngineError, EngineResult};
use crate::metrics;

/// Sampling and acceptance settings for processing runs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Keep every Nth decoded frame (frame 0 always sampled)
    pub sample_stride: u64,
    /// Person detections must exceed this confidence to be accepted
    pub confidence_threshold: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_stride: 5,
            confidence_threshold: 0.70,
        }
    }
}

/// Runs the full per-video pass: decode, sample, detect people,
/// annotate, and persist frames plus a manifest.
pub struct VideoProcessingPipeline {
    detector: Arc<dyn PersonDetector>,
    store: FrameStore,
    config: PipelineConfig,
}

impl VideoProcessingPipeline {
    pub fn new(
        detector: Arc<dyn PersonDetector>,
        store: FrameStore,
        config: PipelineConfig,
    ) -> EngineResult<Self> {
        if config.sample_stride == 0 {
            return Err(EngineError::invalid_input("sample stride must be at least 1"));
        }
        if !(0.0..=1.0).contains(&config.confidence_threshold) {
            return Err(EngineError::invalid_input(
                "confidence threshold must be within [0, 1]",
            ));
        }
        Ok(Self {
            detector,
            store,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one uploaded video end to end and return its report.
    ///
    /// Probe failures surface before the previous frame set is touched,
    /// so a corrupt re-upload cannot wipe an earlier good run.
    pub async fn process(
        &self,
        video_path: &Path,
        video_id: &VideoId,
    ) -> EngineResult<VideoProcessingReport> {
        let info = probe_video(video_path).await?;
        let sampler = FrameSampler::new(self.config.sample_stride)?;
        let mut frames = sampler.open(video_path, &info).await?;
        self.run(video_id, &info, &mut frames).await
    }

    /// Drive the frame loop over an already-open stream.
    async fn run<R: AsyncRead + Unpin>(
        &self,
        video_id: &VideoId,
        info: &VideoInfo,
        frames: &mut FrameStream<R>,
    ) -> EngineResult<VideoProcessingReport> {
        let started = Instant::now();

        // Re-processing replaces the whole frame set.
        self.store.clear_video(video_id).await?;

        let mut records = Vec::new();
        while let Some(frame) = frames.next_frame().await? {
            let detections = self.detector.detect(&frame.image)?;
            let accepted: Vec<Detection> = detections
                .into_iter()
                .filter(|d| d.is_person() && d.confidence > self.config.confidence_threshold)
                .collect();
            if accepted.is_empty() {
                continue;
            }

            let annotated = render_detections(&frame.image, &accepted);
            let filename = self
                .store
                .save_frame(video_id, frame.index, &annotated)
                .await?;
            debug!(
                video_id = %video_id,
                frame = frame.index,
                detections = accepted.len(),
                "Persisted annotated frame"
            );
            metrics::record_detections_accepted(accepted.len() as u64);
            metrics::record_frame_persisted();

            records.push(FrameRecord {
                frame_index: frame.index,
                timestamp: frame.timestamp,
                filename,
                detections: accepted,
            });
        }
        metrics::record_frames_sampled(frames.frames_seen());

        let report = VideoProcessingReport {
            video_id: video_id.clone(),
            total_frames: info.total_frames,
            fps: info.fps,
            frames: records,
        };
        self.store
            .write_manifest(&VideoManifest::from_report(&report, Utc::now()))
            .await?;

        let elapsed = started.elapsed().as_secs_f64();
        metrics::record_video_processed(elapsed);
        info!(
            video_id = %video_id,
            total_frames = report.total_frames,
            detection_frames = report.frames.len(),
            elapsed_secs = elapsed,
            "Video processing completed"
        );
        Ok(report)
    }
}
