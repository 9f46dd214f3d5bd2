//! Engine layer: the video processing pipeline, target registry,
//! similarity search, and the per-pairing result cache.
//!
//! All state is owned here and injected into handlers; nothing in this
//! crate touches process globals. The detector and encoder come in as
//! trait objects so the whole engine runs against stand-ins in tests.

pub mod cache;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod registry;
pub mod search;

// Re-export common types
pub use cache::ResultCache;
pub use error::{EngineError, EngineResult};
pub use pipeline::{PipelineConfig, VideoProcessingPipeline};
pub use registry::TargetRegistry;
pub use search::{SearchConfig, SimilaritySearchEngine};
