//! mednucleus core - shared domain types
//!
//! Pure data types shared by the schema subsystem and the API shell:
//! the medical-specialty / work-type catalog, the legacy-member mapping,
//! and the unified health-check vocabulary. No business logic lives here.

pub mod health;
pub mod specialty;

pub use health::{ComponentHealth, HealthStatus};
pub use specialty::{
    legacy_mapping, required_members, OpportunityType, ParseOpportunityTypeError,
    OPPORTUNITY_TYPE_NAME,
};
