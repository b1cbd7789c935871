//! MedNucleus API Server Entry Point
//!
//! Validates the environment, runs the schema-evolution boot sequence,
//! and starts the axum HTTP server. Schema failures degrade features;
//! only a failed listener bind stops the process.

use std::net::SocketAddr;

use axum::Router;
use mednucleus_api::telemetry::init_tracing;
use mednucleus_api::{create_api_router, ApiConfig, ApiError, ApiResult, AppState};
use mednucleus_schema::boot;

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing()?;

    let report = boot::run().await;
    if !report.health.health_check_passed {
        tracing::warn!("startup checks failed; serving in degraded mode");
    }

    let api_config = ApiConfig::from_env();
    let state = AppState::new(report);
    let app: Router = create_api_router(state, &api_config);

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting MedNucleus API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", port_str)))?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
}
