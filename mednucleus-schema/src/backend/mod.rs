//! Backend probe: hides PostgreSQL/SQLite differences behind uniform
//! schema-introspection primitives.
//!
//! The backend family is decided by a prefix match on the connection URL.
//! Everything downstream (ledger, column migrator, enum repair) speaks to
//! a `dyn SchemaBackend` and never branches on the driver directly, with
//! one exception: DDL text is composed per family by the caller.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{SchemaError, SchemaResult};

pub mod postgres;
pub mod sqlite;

#[cfg(test)]
pub(crate) mod mock;

pub use postgres::PostgresBackend;
pub use sqlite::SqliteBackend;

// ============================================================================
// BACKEND FAMILY
// ============================================================================

/// Database family recognized from the connection URL prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendFamily {
    /// A PostgreSQL server (`postgresql://`, `postgresql+<driver>://`,
    /// legacy `postgres://`).
    Postgres,
    /// The embedded single-file backend (`sqlite:`-prefixed URLs).
    Sqlite,
    /// Anything else: read probes answer "absent", mutations are skipped.
    Unsupported,
}

impl BackendFamily {
    /// Classify a connection URL by its scheme prefix, case-insensitively.
    pub fn from_url(url: &str) -> Self {
        let lower = url.trim().to_ascii_lowercase();
        if lower.starts_with("postgresql://")
            || lower.starts_with("postgresql+")
            || lower.starts_with("postgres://")
        {
            BackendFamily::Postgres
        } else if lower.starts_with("sqlite:") {
            BackendFamily::Sqlite
        } else {
            BackendFamily::Unsupported
        }
    }
}

// ============================================================================
// IDENTIFIER HYGIENE
// ============================================================================

/// Accept only ASCII alphanumeric/underscore identifiers, so interpolating
/// them into DDL text cannot change statement structure.
pub fn validate_identifier(ident: &str) -> SchemaResult<()> {
    let ok = !ident.is_empty()
        && ident.len() <= 63
        && ident
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !ident.chars().next().is_some_and(|c| c.is_ascii_digit());
    if ok {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier {
            ident: ident.to_string(),
        })
    }
}

/// Double-quote an identifier. Tables like `user` collide with reserved
/// words, so every table/column identifier in emitted DDL is quoted.
pub fn quote_identifier(ident: &str) -> String {
    format!("\"{ident}\"")
}

/// Escape a string literal for inline SQL (doubled single quotes).
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

// ============================================================================
// SCHEMA BACKEND TRAIT
// ============================================================================

/// Uniform primitives over the two supported database families.
///
/// Transport failures surface as `Err`; the backend never retries. The
/// embedded backend answers `false`/empty for the enum predicates because
/// enumerated types are an unenforced convention there.
#[async_trait]
pub trait SchemaBackend: Send + Sync {
    /// The family this backend was constructed for.
    fn family(&self) -> BackendFamily;

    /// Cheap connectivity check (`SELECT 1`).
    async fn ping(&self) -> SchemaResult<()>;

    /// Whether `table.column` exists.
    async fn column_exists(&self, table: &str, column: &str) -> SchemaResult<bool>;

    /// Declared type of `table.column`, lowercased, if the column exists.
    async fn column_type(&self, table: &str, column: &str) -> SchemaResult<Option<String>>;

    /// Whether the named enumerated type exists in the catalog.
    async fn enum_type_exists(&self, type_name: &str) -> SchemaResult<bool>;

    /// Current members of the named enumerated type.
    async fn enum_members(&self, type_name: &str) -> SchemaResult<BTreeSet<String>>;

    /// Execute one DDL statement.
    async fn execute_ddl(&self, sql: &str) -> SchemaResult<()>;

    /// Execute one statement under autocommit semantics and return the
    /// affected row count. The statement commits independently of any
    /// other; enum-member additions rely on this.
    async fn execute_autocommit(&self, sql: &str) -> SchemaResult<u64>;

    /// Scalar `SELECT COUNT(*)`-style query.
    async fn query_count(&self, sql: &str) -> SchemaResult<i64>;
}

/// Construct a backend for the given connection URL.
pub async fn connect(url: &str) -> SchemaResult<Arc<dyn SchemaBackend>> {
    match BackendFamily::from_url(url) {
        BackendFamily::Postgres => {
            let backend = PostgresBackend::from_url(url)?;
            Ok(Arc::new(backend))
        }
        BackendFamily::Sqlite => {
            let backend = SqliteBackend::from_url(url)?;
            Ok(Arc::new(backend))
        }
        BackendFamily::Unsupported => {
            let scheme = url.split(':').next().unwrap_or(url).to_string();
            Err(SchemaError::UnsupportedBackend { scheme })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgres_prefixes_are_recognized() {
        assert_eq!(
            BackendFamily::from_url("postgresql://u:p@db.example.com/app"),
            BackendFamily::Postgres
        );
        assert_eq!(
            BackendFamily::from_url("postgresql+psycopg://u:p@host/app"),
            BackendFamily::Postgres
        );
        assert_eq!(
            BackendFamily::from_url("postgres://u:p@host/app"),
            BackendFamily::Postgres
        );
        assert_eq!(
            BackendFamily::from_url("POSTGRESQL://u:p@host/app"),
            BackendFamily::Postgres
        );
    }

    #[test]
    fn sqlite_prefixes_are_recognized() {
        assert_eq!(BackendFamily::from_url("sqlite:///app.db"), BackendFamily::Sqlite);
        assert_eq!(BackendFamily::from_url("sqlite://"), BackendFamily::Sqlite);
        assert_eq!(BackendFamily::from_url("sqlite::memory:"), BackendFamily::Sqlite);
    }

    #[test]
    fn everything_else_is_unsupported() {
        assert_eq!(
            BackendFamily::from_url("mysql://u:p@host/app"),
            BackendFamily::Unsupported
        );
        assert_eq!(BackendFamily::from_url(""), BackendFamily::Unsupported);
        assert_eq!(BackendFamily::from_url("app.db"), BackendFamily::Unsupported);
    }

    #[test]
    fn identifier_validation_rejects_injection() {
        assert!(validate_identifier("forum_post").is_ok());
        assert!(validate_identifier("user").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("forum post").is_err());
        assert!(validate_identifier("t; DROP TABLE x").is_err());
        assert!(validate_identifier("1table").is_err());
    }

    #[test]
    fn quoting_and_escaping() {
        assert_eq!(quote_identifier("user"), "\"user\"");
        assert_eq!(escape_literal("O'Brien"), "O''Brien");
    }
}
