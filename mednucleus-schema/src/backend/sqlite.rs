//! Embedded backend over rusqlite.
//!
//! Column existence comes from the per-table column listing pragma. The
//! enum predicates are no-ops because SQLite has no enumerated types;
//! the application stores those values as plain strings. Every statement
//! runs under rusqlite's default autocommit mode.

use std::collections::BTreeSet;

use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::{quote_identifier, validate_identifier, BackendFamily, SchemaBackend};
use crate::error::{SchemaError, SchemaResult};

pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open from a `sqlite:` connection URL (`sqlite:///app.db`,
    /// `sqlite:////abs/path.db`, `sqlite://` or `sqlite::memory:` for an
    /// in-memory database).
    pub fn from_url(url: &str) -> SchemaResult<Self> {
        let path = sqlite_path(url);
        let conn = if path.is_empty() || path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(&path)
        }
        .map_err(|e| SchemaError::connect(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database, used by tests.
    pub fn in_memory() -> SchemaResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| SchemaError::connect(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    async fn columns(&self, table: &str) -> SchemaResult<Vec<(String, String)>> {
        validate_identifier(table)?;
        let conn = self.conn.lock().await;
        let sql = format!("PRAGMA table_info({})", quote_identifier(table));
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| SchemaError::statement(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?))
            })
            .map_err(|e| SchemaError::statement(e.to_string()))?;

        let mut columns = Vec::new();
        for row in rows {
            columns.push(row.map_err(|e| SchemaError::statement(e.to_string()))?);
        }
        Ok(columns)
    }
}

#[async_trait]
impl SchemaBackend for SqliteBackend {
    fn family(&self) -> BackendFamily {
        BackendFamily::Sqlite
    }

    async fn ping(&self) -> SchemaResult<()> {
        let conn = self.conn.lock().await;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|e| SchemaError::connect(e.to_string()))?;
        Ok(())
    }

    async fn column_exists(&self, table: &str, column: &str) -> SchemaResult<bool> {
        validate_identifier(column)?;
        let columns = self.columns(table).await?;
        Ok(columns.iter().any(|(name, _)| name == column))
    }

    async fn column_type(&self, table: &str, column: &str) -> SchemaResult<Option<String>> {
        validate_identifier(column)?;
        let columns = self.columns(table).await?;
        Ok(columns
            .into_iter()
            .find(|(name, _)| name == column)
            .map(|(_, ty)| ty.to_lowercase()))
    }

    async fn enum_type_exists(&self, _type_name: &str) -> SchemaResult<bool> {
        Ok(false)
    }

    async fn enum_members(&self, _type_name: &str) -> SchemaResult<BTreeSet<String>> {
        Ok(BTreeSet::new())
    }

    async fn execute_ddl(&self, sql: &str) -> SchemaResult<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch(sql)
            .map_err(|e| SchemaError::statement(e.to_string()))
    }

    async fn execute_autocommit(&self, sql: &str) -> SchemaResult<u64> {
        let conn = self.conn.lock().await;
        let affected = conn
            .execute(sql, [])
            .map_err(|e| SchemaError::statement(e.to_string()))?;
        Ok(affected as u64)
    }

    async fn query_count(&self, sql: &str) -> SchemaResult<i64> {
        let conn = self.conn.lock().await;
        conn.query_row(sql, [], |row| row.get::<_, i64>(0))
            .map_err(|e| SchemaError::statement(e.to_string()))
    }
}

/// Extract the filesystem path from a `sqlite:` URL.
fn sqlite_path(url: &str) -> String {
    let lower = url.to_ascii_lowercase();
    let rest = if lower.starts_with("sqlite://") {
        &url["sqlite://".len()..]
    } else if lower.starts_with("sqlite:") {
        &url["sqlite:".len()..]
    } else {
        url
    };
    // Three slashes in the URL mean a relative path, four an absolute one.
    match rest.strip_prefix('/') {
        Some(stripped) => stripped.to_string(),
        None => rest.to_string(),
    }
}
