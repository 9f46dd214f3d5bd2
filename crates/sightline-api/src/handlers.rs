//! Request handlers.

pub mod frames;
pub mod health;
pub mod search;
pub mod targets;
pub mod videos;

pub use frames::*;
pub use health::*;
pub use search::*;
pub use targets::*;
pub use videos::*;
