//! Environment validator: classifies configuration inputs as ok /
//! warning / error. Never aborts boot; the report is folded into the
//! health snapshot and served from the health endpoint.

use std::collections::BTreeMap;
use std::env;

use serde::Serialize;
use tracing::{info, warn};

use crate::backend::BackendFamily;

/// Required configuration variables and what they are for.
pub const REQUIRED_VARS: &[(&str, &str)] = &[
    ("DATABASE_URL", "database connection string"),
    ("SECRET_KEY", "session signing key"),
    ("MAIL_USERNAME", "mail service username"),
    ("MAIL_PASSWORD", "mail service password"),
    ("MAIL_DEFAULT_SENDER", "default mail sender address"),
];

/// Optional configuration variables.
pub const OPTIONAL_VARS: &[(&str, &str)] = &[("CORS_ORIGINS", "allowed CORS origins")];

/// Structured environment report, embedded in the health document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnvReport {
    /// No errors found. Warnings do not fail validation.
    pub passed: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub database_url_set: bool,
    pub secret_key_set: bool,
    pub mail_configured: bool,
    /// Redacted summary of the database URL (scheme and host only).
    pub database_url_summary: Option<String>,
}

impl EnvReport {
    /// Validate the process environment.
    pub fn from_env() -> Self {
        let mut vars = BTreeMap::new();
        for (name, _) in REQUIRED_VARS.iter().chain(OPTIONAL_VARS) {
            if let Ok(value) = env::var(name) {
                vars.insert(name.to_string(), value);
            }
        }
        Self::validate(&vars)
    }

    /// Pure classification over a variable map.
    pub fn validate(vars: &BTreeMap<String, String>) -> Self {
        let mut report = EnvReport::default();

        for (name, description) in REQUIRED_VARS {
            match vars.get(*name).filter(|v| !v.is_empty()) {
                Some(_) => info!(var = name, "required variable present"),
                None => {
                    report
                        .errors
                        .push(format!("missing required variable {name} ({description})"));
                }
            }
        }

        report.database_url_set = vars.get("DATABASE_URL").is_some_and(|v| !v.is_empty());
        report.secret_key_set = vars.get("SECRET_KEY").is_some_and(|v| !v.is_empty());
        report.mail_configured = ["MAIL_USERNAME", "MAIL_PASSWORD", "MAIL_DEFAULT_SENDER"]
            .iter()
            .all(|name| vars.get(*name).is_some_and(|v| !v.is_empty()));

        if let Some(url) = vars.get("DATABASE_URL").filter(|v| !v.is_empty()) {
            report.database_url_summary = Some(redact_url(url));
            classify_database_url(url, &mut report);
        }

        report.passed = report.errors.is_empty();
        for error in &report.errors {
            warn!(%error, "environment validation error");
        }
        for warning in &report.warnings {
            warn!(%warning, "environment validation warning");
        }
        report
    }
}

fn classify_database_url(url: &str, report: &mut EnvReport) {
    let family = BackendFamily::from_url(url);
    if family == BackendFamily::Unsupported {
        report.errors.push(
            "DATABASE_URL must start with postgresql:// or sqlite://".to_string(),
        );
        return;
    }

    if family == BackendFamily::Postgres {
        let lower = url.to_ascii_lowercase();
        let local = lower.contains("localhost") || lower.contains("127.0.0.1");
        if local {
            report.warnings.push(
                "DATABASE_URL points at localhost; confirm this is intended outside development"
                    .to_string(),
            );
        }
        if lower.starts_with("postgres://") {
            report.warnings.push(
                "DATABASE_URL uses the deprecated postgres:// alias; prefer postgresql://"
                    .to_string(),
            );
        }
        let scheme = lower.split("://").next().unwrap_or("");
        if !scheme.contains('+') {
            report.warnings.push(
                "DATABASE_URL carries no driver annotation; hosted configs use postgresql+psycopg://"
                    .to_string(),
            );
        }
        if !local && !lower.contains("sslmode=") {
            report.warnings.push(
                "DATABASE_URL for a hosted database has no sslmode parameter".to_string(),
            );
        }
    }
}

/// Scheme and host only; credentials and path are dropped.
fn redact_url(url: &str) -> String {
    let (scheme, rest) = match url.split_once("://") {
        Some(parts) => parts,
        None => return format!("{}://[redacted]", url.split(':').next().unwrap_or("unknown")),
    };
    let after_creds = rest.rsplit_once('@').map(|(_, host)| host).unwrap_or(rest);
    let host = after_creds
        .split(['/', '?'])
        .next()
        .unwrap_or(after_creds);
    format!("{scheme}://{host}")
}
