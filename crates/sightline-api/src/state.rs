//! Application state.

use std::sync::Arc;

use anyhow::Context;

use sightline_engine::{
    PipelineConfig, ResultCache, SearchConfig, SimilaritySearchEngine, TargetRegistry,
    VideoProcessingPipeline,
};
use sightline_media::FrameStore;
use sightline_vision::{
    ClipConfig, ClipEncoder, DetectorConfig, EmbeddingEncoder, OnnxPersonDetector, PersonDetector,
};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: FrameStore,
    pub pipeline: Arc<VideoProcessingPipeline>,
    pub registry: Arc<TargetRegistry>,
    pub cache: Arc<ResultCache>,
    pub search: Arc<SimilaritySearchEngine>,
}

impl AppState {
    /// Create application state with ONNX-backed models loaded from the
    /// configured paths.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let detector = OnnxPersonDetector::new(DetectorConfig {
            model_path: config.detector_model_path.clone(),
            ..DetectorConfig::default()
        })
        .context("Failed to load person detection model")?;

        let encoder = ClipEncoder::new(ClipConfig {
            visual_model_path: config.clip_visual_model_path.clone(),
            text_model_path: config.clip_text_model_path.clone(),
            tokenizer_path: config.clip_tokenizer_path.clone(),
            ..ClipConfig::default()
        })
        .context("Failed to load CLIP encoder")?;

        Self::with_components(config, Arc::new(detector), Arc::new(encoder)).await
    }

    /// Create application state around caller-provided model
    /// implementations.
    pub async fn with_components(
        config: ApiConfig,
        detector: Arc<dyn PersonDetector>,
        encoder: Arc<dyn EmbeddingEncoder>,
    ) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&config.upload_dir)
            .await
            .context("Failed to create upload directory")?;
        tokio::fs::create_dir_all(&config.frames_dir)
            .await
            .context("Failed to create frame store directory")?;

        let store = FrameStore::new(&config.frames_dir);
        let pipeline = VideoProcessingPipeline::new(
            detector,
            store.clone(),
            PipelineConfig {
                sample_stride: config.sample_stride,
                confidence_threshold: config.detection_threshold,
            },
        )?;
        let registry = Arc::new(TargetRegistry::new(encoder.clone()));
        let cache = Arc::new(ResultCache::new());
        let search = SimilaritySearchEngine::new(
            encoder,
            Arc::clone(&registry),
            Arc::clone(&cache),
            store.clone(),
            SearchConfig {
                similarity_threshold: config.similarity_threshold,
            },
        )?;

        Ok(Self {
            config,
            store,
            pipeline: Arc::new(pipeline),
            registry,
            cache,
            search: Arc::new(search),
        })
    }
}
