//! Migration ledger: the `migrations` table.
//!
//! One row per applied migration, keyed by symbolic name. The UNIQUE
//! constraint on `name` is what makes concurrent boots safe: a duplicate
//! insert from the losing process is normalized to success.

use tracing::warn;

use crate::backend::{escape_literal, BackendFamily, SchemaBackend};
use crate::error::SchemaResult;

/// Ledger table name; also the only table the subsystem creates itself.
pub const LEDGER_TABLE: &str = "migrations";

const CREATE_POSTGRES: &str = "CREATE TABLE IF NOT EXISTS migrations (
    id SERIAL PRIMARY KEY,
    name VARCHAR(255) UNIQUE NOT NULL,
    completed_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)";

const CREATE_SQLITE: &str = "CREATE TABLE IF NOT EXISTS migrations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name VARCHAR(255) UNIQUE NOT NULL,
    completed_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)";

pub struct Ledger;

impl Ledger {
    /// Create the ledger table if absent. Idempotent; a failure is logged
    /// and swallowed so that `has` still gets a chance to answer on
    /// databases where the table pre-exists but the create is refused.
    pub async fn ensure(backend: &dyn SchemaBackend) {
        let ddl = match backend.family() {
            BackendFamily::Postgres => CREATE_POSTGRES,
            BackendFamily::Sqlite => CREATE_SQLITE,
            BackendFamily::Unsupported => {
                warn!("unsupported backend family, ledger not created");
                return;
            }
        };
        if let Err(err) = backend.execute_ddl(ddl).await {
            warn!(error = %err, "ledger bootstrap failed");
        }
    }

    /// True iff a row with that name exists.
    pub async fn has(backend: &dyn SchemaBackend, name: &str) -> SchemaResult<bool> {
        let sql = format!(
            "SELECT COUNT(*) FROM migrations WHERE name = '{}'",
            escape_literal(name)
        );
        let count = backend.query_count(&sql).await?;
        Ok(count > 0)
    }

    /// Record the migration. A duplicate-key collision (another process
    /// got there first) is treated as success.
    pub async fn mark(backend: &dyn SchemaBackend, name: &str) -> SchemaResult<()> {
        let sql = format!(
            "INSERT INTO migrations (name) VALUES ('{}')",
            escape_literal(name)
        );
        match backend.execute_autocommit(&sql).await {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_row(&err) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

/// Both backends word their unique-violation differently; match either.
fn is_duplicate_row(err: &crate::error::SchemaError) -> bool {
    let message = err.message_lowercase();
    message.contains("duplicate key") || message.contains("unique constraint")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SqliteBackend;

    #[tokio::test]
    async fn ensure_is_idempotent() {
        let backend = SqliteBackend::in_memory().unwrap();
        Ledger::ensure(&backend).await;
        Ledger::ensure(&backend).await;
        assert!(!Ledger::has(&backend, "anything").await.unwrap());
    }

    #[tokio::test]
    async fn mark_then_has() {
        let backend = SqliteBackend::in_memory().unwrap();
        Ledger::ensure(&backend).await;
        Ledger::mark(&backend, "add_forum_post_specialty").await.unwrap();
        assert!(Ledger::has(&backend, "add_forum_post_specialty").await.unwrap());
        assert!(!Ledger::has(&backend, "add_user_timezone").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_mark_is_a_noop() {
        let backend = SqliteBackend::in_memory().unwrap();
        Ledger::ensure(&backend).await;
        Ledger::mark(&backend, "step").await.unwrap();
        Ledger::mark(&backend, "step").await.unwrap();
        let count = backend
            .query_count("SELECT COUNT(*) FROM migrations WHERE name = 'step'")
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn names_with_quotes_are_escaped() {
        let backend = SqliteBackend::in_memory().unwrap();
        Ledger::ensure(&backend).await;
        Ledger::mark(&backend, "o'clock").await.unwrap();
        assert!(Ledger::has(&backend, "o'clock").await.unwrap());
    }
}
