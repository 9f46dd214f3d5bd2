//! API configuration.

use std::path::PathBuf;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Max request body size (uploads included)
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Directory uploaded videos are written to
    pub upload_dir: PathBuf,
    /// Frame store root for annotated frames
    pub frames_dir: PathBuf,
    /// Keep every Nth decoded frame
    pub sample_stride: u64,
    /// Person detection acceptance threshold
    pub detection_threshold: f32,
    /// Search match acceptance threshold
    pub similarity_threshold: f32,
    /// Person detection model path
    pub detector_model_path: String,
    /// CLIP visual encoder model path
    pub clip_visual_model_path: String,
    /// CLIP text encoder model path
    pub clip_text_model_path: String,
    /// CLIP tokenizer definition path
    pub clip_tokenizer_path: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            max_body_size: 16 * 1024 * 1024, // 16MB
            environment: "development".to_string(),
            upload_dir: PathBuf::from("uploads"),
            frames_dir: PathBuf::from("processed"),
            sample_stride: 5,
            detection_threshold: 0.70,
            similarity_threshold: 0.70,
            detector_model_path: "models/detector/yolov8n.onnx".to_string(),
            clip_visual_model_path: "models/clip/visual.onnx".to_string(),
            clip_text_model_path: "models/clip/textual.onnx".to_string(),
            clip_tokenizer_path: "models/clip/tokenizer.json".to_string(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            upload_dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            frames_dir: std::env::var("FRAMES_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.frames_dir),
            sample_stride: std::env::var("SAMPLE_STRIDE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.sample_stride),
            detection_threshold: std::env::var("DETECTION_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.detection_threshold),
            similarity_threshold: std::env::var("SIMILARITY_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.similarity_threshold),
            detector_model_path: std::env::var("DETECTOR_MODEL_PATH")
                .unwrap_or(defaults.detector_model_path),
            clip_visual_model_path: std::env::var("CLIP_VISUAL_MODEL_PATH")
                .unwrap_or(defaults.clip_visual_model_path),
            clip_text_model_path: std::env::var("CLIP_TEXT_MODEL_PATH")
                .unwrap_or(defaults.clip_text_model_path),
            clip_tokenizer_path: std::env::var("CLIP_TOKENIZER_PATH")
                .unwrap_or(defaults.clip_tokenizer_path),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}
