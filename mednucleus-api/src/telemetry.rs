//! Tracing subscriber setup for the API process.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ApiError, ApiResult};

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` overrides the default filter. JSON output is used when
/// `LOG_FORMAT=json`, which is what hosted deployments set.
pub fn init_tracing() -> ApiResult<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("mednucleus_api=debug,mednucleus_schema=debug,tower_http=debug,info")
    });

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    result.map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {e}")))
}
