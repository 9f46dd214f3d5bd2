//! Axum HTTP API server.
//!
//! This crate provides:
//! - Video upload and processing endpoint
//! - Target registration and similarity search endpoints
//! - Static serving of annotated frames
//! - Prometheus metrics and security headers

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod security;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
