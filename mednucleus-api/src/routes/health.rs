//! Health Check Endpoints
//!
//! - /health       - Full startup diagnostic document
//! - /health/ping  - Simple liveness check
//! - /health/live  - Process alive check
//! - /health/ready - Readiness gate for orchestrators
//!
//! No authentication required for health endpoints.

use std::collections::BTreeMap;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use mednucleus_schema::env_check::EnvReport;

use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

/// The full diagnostic document served at `/health`. Always HTTP 200;
/// the `status` field carries the verdict so dashboards can fetch it
/// even while the service is degraded.
#[derive(Debug, Clone, Serialize)]
pub struct HealthDocument {
    /// "OK" exactly when the startup health check passed.
    pub status: &'static str,
    /// "OK" or the connection error text.
    pub database: String,
    /// Human-readable required-column summary.
    pub tables: String,
    pub health_check_passed: bool,
    pub detailed_health: DetailedHealth,
    pub environment: EnvReport,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailedHealth {
    /// Stable-key boolean map from the boot snapshot.
    pub checks: BTreeMap<&'static str, bool>,
    /// Feature-name -> enabled map from the capability gate.
    pub capabilities: BTreeMap<&'static str, bool>,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health - full startup diagnostic
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let boot = &state.boot;
    let document = HealthDocument {
        status: if boot.health.health_check_passed {
            "OK"
        } else {
            "ERROR"
        },
        database: match &boot.database_error {
            Some(reason) => reason.clone(),
            None => "OK".to_string(),
        },
        tables: boot.tables_summary.clone(),
        health_check_passed: boot.health.health_check_passed,
        detailed_health: DetailedHealth {
            checks: boot.health.status_map(),
            capabilities: boot.capabilities.as_map().clone(),
        },
        environment: boot.env.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    };
    (StatusCode::OK, Json(document))
}

/// GET /health/ping - simple pong response
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

/// GET /health/live - process liveness check
pub async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "alive" })))
}

/// GET /health/ready - readiness gate; 503 until the startup checks pass
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let passed = state.boot.health.health_check_passed;
    let status = if passed {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(serde_json::json!({ "ready": passed })),
    )
}

// ============================================================================
// ROUTER
// ============================================================================

/// Health check router (no auth required).
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use mednucleus_schema::boot;
    use tower::ServiceExt;

    async fn document_for(report: mednucleus_schema::BootReport) -> (StatusCode, serde_json::Value) {
        let router = create_router(AppState::new(report));
        let response = router
            .oneshot(
                axum::http::Request::builder()
                    .uri("/")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn degraded_boot_still_serves_the_document() {
        let report = boot::run_with(EnvReport::default(), None).await;
        let (status, body) = document_for(report).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ERROR");
        assert_eq!(body["health_check_passed"], false);
        assert!(body["database"].as_str().unwrap().contains("DATABASE_URL"));
        assert_eq!(body["detailed_health"]["checks"]["DB_CONNECTIVITY"], false);
        assert_eq!(
            body["detailed_health"]["capabilities"]["forum_specialty"],
            false
        );
    }

    #[tokio::test]
    async fn readiness_reflects_the_boot_verdict() {
        let report = boot::run_with(EnvReport::default(), None).await;
        let router = create_router(AppState::new(report));
        let response = router
            .oneshot(
                axum::http::Request::builder()
                    .uri("/ready")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn ping_pongs() {
        let router = create_router(AppState::new(Default::default()));
        let response = router
            .oneshot(
                axum::http::Request::builder()
                    .uri("/ping")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
