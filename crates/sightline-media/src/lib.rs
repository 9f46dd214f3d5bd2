//! Media layer: FFmpeg/FFprobe plumbing, frame sampling, annotation, and
//! the on-disk store for annotated frames.
//!
//! Everything that touches the filesystem or an external process lives
//! here; inference and search sit in separate crates on top of this one.

pub mod annotate;
pub mod error;
pub mod probe;
pub mod sampler;
pub mod store;

// Re-export common types
pub use annotate::{decode_image, encode_jpeg, load_image, render_detections};
pub use error::{MediaError, MediaResult};
pub use probe::{check_tooling, probe_video, VideoInfo};
pub use sampler::{FrameSampler, FrameStream, SampledFrame};
pub use store::{FrameStore, StoredFrame};
