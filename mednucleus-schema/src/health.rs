//! Health aggregator: composes the per-component boot results into one
//! process-wide snapshot with stable keys.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Serialize;
use tracing::{info, warn};

use mednucleus_core::health::ComponentHealth;
use mednucleus_core::specialty::{required_members, OpportunityType};

use crate::backend::SchemaBackend;

/// Columns the application cannot serve its core pages without.
pub const REQUIRED_COLUMNS: &[(&str, &str)] = &[
    ("job_review", "specialty"),
    ("resident_profile", "medical_specialty"),
    ("employer_profile", "medical_specialty"),
    ("forum_post", "specialty"),
];

// Stable keys for the status map; monitoring depends on these names.
pub const KEY_ENV_VALIDATION_PASSED: &str = "ENV_VALIDATION_PASSED";
pub const KEY_DB_CONNECTIVITY: &str = "DB_CONNECTIVITY";
pub const KEY_COLUMNS_READY: &str = "COLUMNS_READY";
pub const KEY_ENUM_FIXED_ON_STARTUP: &str = "ENUM_FIXED_ON_STARTUP";
pub const KEY_ENUM_FUNCTIONALITY: &str = "ENUM_FUNCTIONALITY";
pub const KEY_HEALTH_CHECK_PASSED: &str = "HEALTH_CHECK_PASSED";

/// Process-wide health snapshot, written once at the end of boot.
///
/// Invariant: `health_check_passed` implies `db_connectivity`,
/// `columns_ready`, and `enum_functionality`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    pub env_valid: bool,
    pub db_connectivity: bool,
    pub columns_ready: bool,
    pub enum_fixed: bool,
    pub enum_functionality: bool,
    pub health_check_passed: bool,
    /// Per-component detail for the health endpoint.
    pub checks: Vec<ComponentHealth>,
}

impl HealthSnapshot {
    /// Compose the snapshot from the individual boot results.
    pub fn compose(
        env_valid: bool,
        db_connectivity: bool,
        columns_ready: bool,
        enum_fixed: bool,
    ) -> Self {
        let enum_functionality = enum_parser_self_test();
        let health_check_passed = db_connectivity && columns_ready && enum_functionality;

        let mut checks = Vec::new();
        checks.push(flag_check("environment", env_valid));
        checks.push(flag_check("database", db_connectivity));
        checks.push(flag_check("columns", columns_ready));
        checks.push(flag_check("enum_repair", enum_fixed));
        checks.push(flag_check("enum_functionality", enum_functionality));

        let snapshot = Self {
            env_valid,
            db_connectivity,
            columns_ready,
            enum_fixed,
            enum_functionality,
            health_check_passed,
            checks,
        };

        if health_check_passed {
            info!("all startup health checks passed");
        } else {
            let failed: Vec<&str> = snapshot
                .checks
                .iter()
                .filter(|c| !c.status.is_healthy())
                .map(|c| c.component.as_str())
                .collect();
            warn!(?failed, "startup health checks failed; serving degraded");
        }
        snapshot
    }

    /// The stable-key boolean map stored in process-wide state.
    pub fn status_map(&self) -> BTreeMap<&'static str, bool> {
        BTreeMap::from([
            (KEY_ENV_VALIDATION_PASSED, self.env_valid),
            (KEY_DB_CONNECTIVITY, self.db_connectivity),
            (KEY_COLUMNS_READY, self.columns_ready),
            (KEY_ENUM_FIXED_ON_STARTUP, self.enum_fixed),
            (KEY_ENUM_FUNCTIONALITY, self.enum_functionality),
            (KEY_HEALTH_CHECK_PASSED, self.health_check_passed),
        ])
    }
}

fn flag_check(component: &str, ok: bool) -> ComponentHealth {
    if ok {
        ComponentHealth::healthy(component)
    } else {
        ComponentHealth::unhealthy(component, "check failed during boot")
    }
}

/// Re-probe the columns the application cannot run without; returns the
/// ones still missing (a failed probe counts as missing).
pub async fn missing_required_columns(backend: &dyn SchemaBackend) -> Vec<String> {
    let mut missing = Vec::new();
    for (table, column) in REQUIRED_COLUMNS {
        match backend.column_exists(table, column).await {
            Ok(true) => {}
            Ok(false) => missing.push(format!("{table}.{column}")),
            Err(err) => {
                warn!(table, column, error = %err, "required-column probe failed");
                missing.push(format!("{table}.{column}"));
            }
        }
    }
    if !missing.is_empty() {
        warn!(?missing, "required columns missing; features limited");
    }
    missing
}

/// Convenience wrapper over [`missing_required_columns`].
pub async fn required_columns_ready(backend: &dyn SchemaBackend) -> bool {
    missing_required_columns(backend).await.is_empty()
}

/// Every required member must round-trip through the in-memory parser,
/// or inserts would start failing the moment a user picks it.
fn enum_parser_self_test() -> bool {
    required_members()
        .iter()
        .all(|member| OpportunityType::from_str(member).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;

    #[test]
    fn passed_implies_the_three_gates() {
        let snapshot = HealthSnapshot::compose(true, true, true, true);
        assert!(snapshot.health_check_passed);
        assert!(snapshot.db_connectivity && snapshot.columns_ready && snapshot.enum_functionality);
    }

    #[test]
    fn env_warning_does_not_fail_the_check() {
        let snapshot = HealthSnapshot::compose(false, true, true, true);
        assert!(snapshot.health_check_passed);
        assert!(!snapshot.env_valid);
    }

    #[test]
    fn no_database_means_no_pass() {
        let snapshot = HealthSnapshot::compose(true, false, false, false);
        assert!(!snapshot.health_check_passed);
        let map = snapshot.status_map();
        assert_eq!(map[KEY_DB_CONNECTIVITY], false);
        assert_eq!(map[KEY_HEALTH_CHECK_PASSED], false);
    }

    #[test]
    fn status_map_uses_stable_keys() {
        let map = HealthSnapshot::compose(true, true, true, true).status_map();
        for key in [
            KEY_ENV_VALIDATION_PASSED,
            KEY_DB_CONNECTIVITY,
            KEY_COLUMNS_READY,
            KEY_ENUM_FIXED_ON_STARTUP,
            KEY_ENUM_FUNCTIONALITY,
            KEY_HEALTH_CHECK_PASSED,
        ] {
            assert!(map.contains_key(key), "missing {key}");
        }
    }

    #[tokio::test]
    async fn required_columns_probe() {
        let backend = MockBackend::postgres()
            .with_column("job_review", "specialty", "varchar(200)")
            .with_column("resident_profile", "medical_specialty", "varchar(100)")
            .with_column("employer_profile", "medical_specialty", "varchar(100)")
            .with_column("forum_post", "specialty", "varchar(100)");
        assert!(required_columns_ready(&backend).await);

        let partial = MockBackend::postgres().with_column("forum_post", "specialty", "text");
        assert!(!required_columns_ready(&partial).await);
    }
}
