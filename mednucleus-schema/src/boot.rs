//! Boot sequencer: the one entrypoint that brings the database forward
//! and produces the process-wide boot report.
//!
//! Order is part of the contract: environment validation, connectivity
//! probe, ledger bootstrap, column migrations, enum repair, data
//! rewrites, capability refresh, health aggregation. Every step is
//! isolated; a failure downgrades a flag and the process serves anyway.
//! Runs exactly once, on the startup thread, before the listener binds.

use serde::Serialize;
use tracing::{error, info};

use crate::backend::{self, SchemaBackend};
use crate::capabilities::CapabilityMap;
use crate::enum_repair::{self, EnumRepairReport, EnumTypeSpec};
use crate::env_check::EnvReport;
use crate::health::{missing_required_columns, HealthSnapshot};
use crate::ledger::Ledger;
use crate::migrate::{run_steps, MigrationOutcome};
use crate::steps::{column_steps, rewrite_steps};

/// Everything the rest of the application learns from boot. Immutable
/// once constructed; the API shell holds it behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BootReport {
    pub health: HealthSnapshot,
    pub capabilities: CapabilityMap,
    pub env: EnvReport,
    pub migrations: MigrationOutcome,
    pub enum_repair: Option<EnumRepairReport>,
    /// Why the database was unreachable, when it was.
    pub database_error: Option<String>,
    /// Human-readable column status for the health endpoint.
    pub tables_summary: String,
}

impl BootReport {
    fn no_database(env: EnvReport, reason: String) -> Self {
        error!(%reason, "database unavailable; serving with all features disabled");
        let health = HealthSnapshot::compose(env.passed, false, false, false);
        Self {
            health,
            capabilities: CapabilityMap::all_disabled(),
            env,
            migrations: MigrationOutcome::default(),
            enum_repair: None,
            database_error: Some(reason),
            tables_summary: "unknown (no database connection)".to_string(),
        }
    }
}

/// Run the full boot sequence from the process environment.
pub async fn run() -> BootReport {
    let env = EnvReport::from_env();
    let url = std::env::var("DATABASE_URL").ok();
    run_with(env, url.as_deref()).await
}

/// Run the boot sequence with an explicit environment report and URL.
pub async fn run_with(env: EnvReport, database_url: Option<&str>) -> BootReport {
    let url = match database_url {
        Some(url) if !url.is_empty() => url,
        _ => return BootReport::no_database(env, "DATABASE_URL is not set".to_string()),
    };

    let backend = match backend::connect(url).await {
        Ok(backend) => backend,
        Err(err) => return BootReport::no_database(env, err.to_string()),
    };

    if let Err(err) = backend.ping().await {
        return BootReport::no_database(env, err.to_string());
    }
    info!(family = ?backend.family(), "database connection successful");

    run_on(backend.as_ref(), env).await
}

/// Boot against an already-connected backend.
pub async fn run_on(backend: &dyn SchemaBackend, env: EnvReport) -> BootReport {
    Ledger::ensure(backend).await;

    let mut migrations = run_steps(backend, column_steps()).await;

    let enum_report = enum_repair::ensure(backend, &EnumTypeSpec::opportunity_type()).await;

    migrations.merge(run_steps(backend, rewrite_steps()).await);

    let capabilities = CapabilityMap::refresh(backend).await;

    let missing = missing_required_columns(backend).await;
    let columns_ready = missing.is_empty();
    let tables_summary = if columns_ready {
        "all required columns present".to_string()
    } else {
        format!("missing columns: {}", missing.join(", "))
    };

    let health = HealthSnapshot::compose(env.passed, true, columns_ready, enum_report.ok);

    info!(
        applied = migrations.applied.len(),
        recorded = migrations.recorded.len(),
        skipped = migrations.skipped.len(),
        failed = migrations.failed.len(),
        enum_ok = enum_report.ok,
        health_check_passed = health.health_check_passed,
        "boot sequence complete"
    );

    BootReport {
        health,
        capabilities,
        env,
        migrations,
        enum_repair: Some(enum_report),
        database_error: None,
        tables_summary,
    }
}
