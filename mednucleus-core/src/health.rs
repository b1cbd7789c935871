//! Unified health check types
//!
//! Shared by the schema subsystem (which produces per-component results
//! during boot) and the API shell (which serves them from `/health`).

use serde::{Deserialize, Serialize};

/// Health status for a service or component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Component is fully operational
    Healthy,
    /// Component is operational but degraded
    Degraded,
    /// Component is not operational
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

/// Health check result for a single boot component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name (e.g. "database", "columns", "enum_repair")
    pub component: String,
    /// Overall health status
    pub status: HealthStatus,
    /// Detailed status message
    pub message: Option<String>,
}

impl ComponentHealth {
    /// Create a healthy check result.
    pub fn healthy(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthStatus::Healthy,
            message: None,
        }
    }

    /// Create a degraded check result.
    pub fn degraded(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthStatus::Degraded,
            message: Some(message.into()),
        }
    }

    /// Create an unhealthy check result.
    pub fn unhealthy(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthStatus::Unhealthy,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_status() {
        assert!(ComponentHealth::healthy("db").status.is_healthy());
        let degraded = ComponentHealth::degraded("columns", "missing forum_post.specialty");
        assert_eq!(degraded.status, HealthStatus::Degraded);
        assert!(degraded.message.is_some());
        assert_eq!(
            ComponentHealth::unhealthy("db", "connect refused").status,
            HealthStatus::Unhealthy
        );
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&HealthStatus::Healthy).unwrap();
        assert_eq!(json, "\"healthy\"");
    }
}
