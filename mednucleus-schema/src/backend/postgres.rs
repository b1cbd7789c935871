//! PostgreSQL backend over a deadpool-postgres pool.
//!
//! Probes read the information schema and `enum_range` over the type OID.
//! `execute_autocommit` issues the statement through the simple query
//! protocol on a pooled connection with no surrounding transaction, so
//! each statement commits on its own. `ALTER TYPE ... ADD VALUE` cannot
//! run inside an explicit transaction block on the server versions we
//! support, which makes this the load-bearing method of the subsystem.

use std::collections::BTreeSet;

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use tokio_postgres::{NoTls, SimpleQueryMessage};

use super::{validate_identifier, BackendFamily, SchemaBackend};
use crate::error::{SchemaError, SchemaResult};

/// Maximum pool size; boot is single-threaded so this stays small.
const POOL_SIZE: usize = 4;

pub struct PostgresBackend {
    pool: Pool,
}

impl PostgresBackend {
    /// Build a pool from a `postgresql://` connection URL.
    ///
    /// A `postgresql+<driver>://` annotation (carried over from hosted
    /// environment configs) is stripped before parsing; tokio-postgres
    /// understands the bare scheme only.
    pub fn from_url(url: &str) -> SchemaResult<Self> {
        let normalized = normalize_url(url);
        let config: tokio_postgres::Config = normalized
            .parse()
            .map_err(|e: tokio_postgres::Error| SchemaError::connect(pg_reason(&e)))?;

        let manager = Manager::from_config(
            config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );
        let pool = Pool::builder(manager)
            .max_size(POOL_SIZE)
            .build()
            .map_err(|e| SchemaError::connect(format!("failed to create pool: {e}")))?;

        Ok(Self { pool })
    }

    async fn client(&self) -> SchemaResult<Object> {
        self.pool
            .get()
            .await
            .map_err(|e| SchemaError::connect(e.to_string()))
    }
}

#[async_trait]
impl SchemaBackend for PostgresBackend {
    fn family(&self) -> BackendFamily {
        BackendFamily::Postgres
    }

    async fn ping(&self) -> SchemaResult<()> {
        let client = self.client().await?;
        client
            .simple_query("SELECT 1")
            .await
            .map_err(|e| SchemaError::connect(pg_reason(&e)))?;
        Ok(())
    }

    async fn column_exists(&self, table: &str, column: &str) -> SchemaResult<bool> {
        validate_identifier(table)?;
        validate_identifier(column)?;
        let client = self.client().await?;
        let row = client
            .query_one(
                "SELECT EXISTS (
                    SELECT 1 FROM information_schema.columns
                    WHERE table_name = $1 AND column_name = $2
                )",
                &[&table, &column],
            )
            .await
            .map_err(|e| SchemaError::statement(pg_reason(&e)))?;
        Ok(row.get(0))
    }

    async fn column_type(&self, table: &str, column: &str) -> SchemaResult<Option<String>> {
        validate_identifier(table)?;
        validate_identifier(column)?;
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT data_type FROM information_schema.columns
                 WHERE table_name = $1 AND column_name = $2",
                &[&table, &column],
            )
            .await
            .map_err(|e| SchemaError::statement(pg_reason(&e)))?;
        Ok(row.map(|r| r.get::<_, String>(0).to_lowercase()))
    }

    async fn enum_type_exists(&self, type_name: &str) -> SchemaResult<bool> {
        validate_identifier(type_name)?;
        let client = self.client().await?;
        let row = client
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM pg_type WHERE typname = $1)",
                &[&type_name],
            )
            .await
            .map_err(|e| SchemaError::statement(pg_reason(&e)))?;
        Ok(row.get(0))
    }

    async fn enum_members(&self, type_name: &str) -> SchemaResult<BTreeSet<String>> {
        validate_identifier(type_name)?;
        let client = self.client().await?;
        // Type names cannot be bound as parameters; the identifier was
        // validated above.
        let sql = format!("SELECT unnest(enum_range(NULL::{type_name}))::text");
        let messages = client
            .simple_query(&sql)
            .await
            .map_err(|e| SchemaError::statement(pg_reason(&e)))?;

        let mut members = BTreeSet::new();
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                if let Some(member) = row.get(0) {
                    members.insert(member.to_string());
                }
            }
        }
        Ok(members)
    }

    async fn execute_ddl(&self, sql: &str) -> SchemaResult<()> {
        let client = self.client().await?;
        client
            .simple_query(sql)
            .await
            .map_err(|e| SchemaError::statement(pg_reason(&e)))?;
        Ok(())
    }

    async fn execute_autocommit(&self, sql: &str) -> SchemaResult<u64> {
        let client = self.client().await?;
        let messages = client
            .simple_query(sql)
            .await
            .map_err(|e| SchemaError::statement(pg_reason(&e)))?;

        let mut affected = 0;
        for message in messages {
            if let SimpleQueryMessage::CommandComplete(count) = message {
                affected = count;
            }
        }
        Ok(affected)
    }

    async fn query_count(&self, sql: &str) -> SchemaResult<i64> {
        let client = self.client().await?;
        let row = client
            .query_one(sql, &[])
            .await
            .map_err(|e| SchemaError::statement(pg_reason(&e)))?;
        Ok(row.get(0))
    }
}

/// Strip a `+<driver>` annotation from the URL scheme.
fn normalize_url(url: &str) -> String {
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("postgresql+") {
        if let Some(rest) = url.split_once("://").map(|(_, rest)| rest) {
            return format!("postgresql://{rest}");
        }
    }
    url.to_string()
}

/// Prefer the server-side message; driver wrappers obscure it.
fn pg_reason(err: &tokio_postgres::Error) -> String {
    err.as_db_error()
        .map(|db| db.message().to_string())
        .unwrap_or_else(|| err.to_string())
}
