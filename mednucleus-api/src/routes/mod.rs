//! Route composition.

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::state::AppState;

pub mod health;
pub mod specialties;

/// Compose the full application router.
pub fn create_api_router(state: AppState, config: &ApiConfig) -> Router {
    let api = Router::new()
        .route("/api/specialties", get(specialties::list))
        .with_state(state.clone());

    Router::new()
        .nest("/health", health::create_router(state))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(config.cors_layer())
}
