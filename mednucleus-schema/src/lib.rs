//! Runtime schema evolution for the MedNucleus database.
//!
//! Hosted deployments run migrations at process start rather than from
//! an operator shell: every boot probes the live schema, applies the
//! column and enum changes it is missing, records them in a ledger, and
//! publishes a health snapshot plus a feature-capability gate derived
//! from what actually exists. Everything here is idempotent and
//! failure-isolated; a broken migration degrades a feature instead of
//! keeping the process down.

pub mod backend;
pub mod boot;
pub mod capabilities;
pub mod enum_repair;
pub mod env_check;
pub mod error;
pub mod health;
pub mod ledger;
pub mod migrate;
pub mod steps;

pub use backend::{connect, BackendFamily, SchemaBackend};
pub use boot::{run, BootReport};
pub use capabilities::{CapabilityMap, FeatureKey};
pub use enum_repair::{EnumRepairReport, EnumTypeSpec};
pub use env_check::EnvReport;
pub use error::{SchemaError, SchemaResult};
pub use health::HealthSnapshot;
pub use ledger::Ledger;
pub use migrate::MigrationOutcome;
pub use steps::MigrationStep;
