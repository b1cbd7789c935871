//! HTTP shell for the MedNucleus community platform.
//!
//! The binary runs the schema-evolution boot sequence exactly once,
//! freezes its report into shared state, and serves the health and API
//! surface over axum. A degraded boot still serves; only a failed
//! listener bind is fatal.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::create_api_router;
pub use state::AppState;
