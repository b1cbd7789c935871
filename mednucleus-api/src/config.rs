//! API Configuration Module
//!
//! CORS and bind settings, loaded from environment variables with
//! development-friendly defaults.

use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

/// API configuration resolved once at startup.
#[derive(Debug, Clone, Default)]
pub struct ApiConfig {
    /// Allowed CORS origins (comma-separated in `CORS_ORIGINS`).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let cors_origins = std::env::var("CORS_ORIGINS")
            .map(|value| {
                value
                    .split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Self { cors_origins }
    }

    /// Build the CORS layer. Unparseable origins are dropped with a
    /// warning rather than failing startup.
    pub fn cors_layer(&self) -> CorsLayer {
        let layer = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers(Any);

        if self.cors_origins.is_empty() {
            return layer.allow_origin(Any);
        }

        let origins: Vec<HeaderValue> = self
            .cors_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin, "ignoring unparseable CORS origin");
                    None
                }
            })
            .collect();
        layer.allow_origin(origins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_list_is_trimmed_and_filtered() {
        let config = ApiConfig {
            cors_origins: Vec::new(),
        };
        assert!(config.cors_origins.is_empty());

        let parsed: Vec<String> = "https://mednucleus.com, https://app.mednucleus.com,,"
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        assert_eq!(parsed.len(), 2);
    }
}
