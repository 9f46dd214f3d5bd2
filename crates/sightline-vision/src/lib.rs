//! Vision layer: ONNX person detection and CLIP embeddings.
//!
//! Both models run through ONNX Runtime with automatic execution
//! provider selection (CUDA when enabled, CoreML on macOS, CPU
//! everywhere). The [`PersonDetector`] and [`EmbeddingEncoder`] traits
//! are the seams the engine crate is generic over, so tests can swap in
//! deterministic stand-ins without model files.

pub mod detector;
pub mod encoder;
pub mod error;
mod session;

// Re-export common types
pub use detector::{DetectorConfig, OnnxPersonDetector, PersonDetector, COCO_CLASSES};
pub use encoder::{ClipConfig, ClipEncoder, EmbeddingEncoder};
pub use error::{VisionError, VisionResult};
