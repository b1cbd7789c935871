//! Column migrator and data rewriter: interprets the step catalog.
//!
//! Per step: skip when the ledger records it, probe whether the change is
//! already present, emit backend-appropriate DDL otherwise, then mark the
//! ledger. A failure in one step never stops later steps.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::backend::{quote_identifier, BackendFamily, SchemaBackend};
use crate::ledger::Ledger;
use crate::steps::{ColumnType, MigrationStep};

/// What happened to each step of a run, by ledger name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationOutcome {
    /// DDL emitted (or change found present) and ledger marked this boot.
    pub applied: Vec<&'static str>,
    /// Ledger already recorded the step; nothing probed or emitted.
    pub recorded: Vec<&'static str>,
    /// Step does not apply on this backend; ledger deliberately not
    /// marked so a later PostgreSQL deployment of the same database
    /// would still run it.
    pub skipped: Vec<&'static str>,
    /// DDL failed; ledger not marked, retried next boot.
    pub failed: Vec<&'static str>,
}

impl MigrationOutcome {
    pub fn ok(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn merge(&mut self, other: MigrationOutcome) {
        self.applied.extend(other.applied);
        self.recorded.extend(other.recorded);
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
    }
}

/// Run the given steps in order against the backend.
pub async fn run_steps(
    backend: &dyn SchemaBackend,
    steps: impl Iterator<Item = &'static MigrationStep>,
) -> MigrationOutcome {
    let mut outcome = MigrationOutcome::default();

    if backend.family() == BackendFamily::Unsupported {
        warn!("unknown backend family, migration steps skipped");
        outcome.skipped = steps.map(|s| s.name()).collect();
        return outcome;
    }

    for step in steps {
        let name = step.name();
        match Ledger::has(backend, name).await {
            Ok(true) => {
                outcome.recorded.push(name);
                continue;
            }
            Ok(false) => {}
            Err(err) => {
                // Ledger unreadable; fall through to the probe, which is
                // authoritative about the schema itself.
                warn!(step = name, error = %err, "ledger lookup failed");
            }
        }

        match run_step(backend, step).await {
            StepResult::Applied => {
                mark(backend, name).await;
                outcome.applied.push(name);
            }
            StepResult::Skipped => outcome.skipped.push(name),
            StepResult::Failed => outcome.failed.push(name),
        }
    }

    outcome
}

enum StepResult {
    Applied,
    Skipped,
    Failed,
}

async fn run_step(backend: &dyn SchemaBackend, step: &MigrationStep) -> StepResult {
    match *step {
        MigrationStep::AddColumn {
            name,
            table,
            column,
            ty,
        } => add_column(backend, name, table, column, ty).await,
        MigrationStep::DropColumn {
            name,
            table,
            column,
        } => drop_column(backend, name, table, column).await,
        MigrationStep::WidenColumn {
            name,
            table,
            column,
            width,
        } => widen_column(backend, name, table, column, width).await,
        MigrationStep::RewriteValues {
            name,
            table,
            column,
            from,
            to,
        } => rewrite_values(backend, name, table, column, from, to).await,
    }
}

async fn add_column(
    backend: &dyn SchemaBackend,
    name: &str,
    table: &str,
    column: &str,
    ty: ColumnType,
) -> StepResult {
    match backend.column_exists(table, column).await {
        Ok(true) => {
            info!(step = name, table, column, "column already present");
            return StepResult::Applied;
        }
        Ok(false) => {}
        Err(err) => {
            error!(step = name, error = %err, "column probe failed");
            return StepResult::Failed;
        }
    }

    let sql = format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        quote_identifier(table),
        quote_identifier(column),
        ty.sql()
    );
    match backend.execute_ddl(&sql).await {
        Ok(()) => {
            info!(step = name, table, column, "column added");
            StepResult::Applied
        }
        Err(err) => {
            error!(step = name, table, column, error = %err, "add column failed");
            StepResult::Failed
        }
    }
}

async fn drop_column(
    backend: &dyn SchemaBackend,
    name: &str,
    table: &str,
    column: &str,
) -> StepResult {
    // The embedded backend tolerates retired columns; dropping is not
    // worth a table rebuild there.
    if backend.family() == BackendFamily::Sqlite {
        info!(step = name, "drop skipped on embedded backend");
        return StepResult::Skipped;
    }

    match backend.column_exists(table, column).await {
        Ok(false) => {
            info!(step = name, table, column, "column already gone");
            return StepResult::Applied;
        }
        Ok(true) => {}
        Err(err) => {
            error!(step = name, error = %err, "column probe failed");
            return StepResult::Failed;
        }
    }

    let sql = format!(
        "ALTER TABLE {} DROP COLUMN {}",
        quote_identifier(table),
        quote_identifier(column)
    );
    match backend.execute_ddl(&sql).await {
        Ok(()) => {
            info!(step = name, table, column, "column dropped");
            StepResult::Applied
        }
        Err(err) => {
            error!(step = name, table, column, error = %err, "drop column failed");
            StepResult::Failed
        }
    }
}

async fn widen_column(
    backend: &dyn SchemaBackend,
    name: &str,
    table: &str,
    column: &str,
    width: u32,
) -> StepResult {
    if backend.family() == BackendFamily::Sqlite {
        // SQLite is type-flexible and cannot ALTER COLUMN TYPE; skipped
        // without a ledger row.
        info!(step = name, "widen skipped on embedded backend");
        return StepResult::Skipped;
    }

    match backend.column_exists(table, column).await {
        Ok(false) => {
            info!(step = name, table, column, "column absent, nothing to widen");
            return StepResult::Applied;
        }
        Ok(true) => {}
        Err(err) => {
            error!(step = name, error = %err, "column probe failed");
            return StepResult::Failed;
        }
    }

    // Catalogs that report a length let us skip the rewrite entirely.
    if let Ok(Some(ty)) = backend.column_type(table, column).await {
        if varchar_width(&ty).is_some_and(|current| current >= width) {
            info!(step = name, table, column, ty, "column already wide enough");
            return StepResult::Applied;
        }
    }

    let sql = format!(
        "ALTER TABLE {} ALTER COLUMN {} TYPE VARCHAR({})",
        quote_identifier(table),
        quote_identifier(column),
        width
    );
    match backend.execute_ddl(&sql).await {
        Ok(()) => {
            info!(step = name, table, column, width, "column widened");
            StepResult::Applied
        }
        Err(err) => {
            error!(step = name, table, column, error = %err, "widen column failed");
            StepResult::Failed
        }
    }
}

/// Declared width of a `varchar(N)` / `character varying(N)` type, if
/// the catalog reports one.
fn varchar_width(ty: &str) -> Option<u32> {
    let start = ty.find('(')?;
    let end = ty[start..].find(')')? + start;
    ty[start + 1..end].trim().parse().ok()
}

async fn rewrite_values(
    backend: &dyn SchemaBackend,
    name: &str,
    table: &str,
    column: &str,
    from: &str,
    to: &str,
) -> StepResult {
    let sql = format!(
        "UPDATE {} SET {} = '{}' WHERE {} = '{}'",
        quote_identifier(table),
        quote_identifier(column),
        crate::backend::escape_literal(to),
        quote_identifier(column),
        crate::backend::escape_literal(from)
    );
    match backend.execute_autocommit(&sql).await {
        Ok(rows) => {
            info!(step = name, table, column, rows, "values rewritten");
            StepResult::Applied
        }
        Err(err) => {
            error!(step = name, table, column, error = %err, "rewrite failed");
            StepResult::Failed
        }
    }
}

async fn mark(backend: &dyn SchemaBackend, name: &str) {
    if let Err(err) = Ledger::mark(backend, name).await {
        // The change is in place; an unmarked ledger just means the next
        // boot re-probes and marks then.
        warn!(step = name, error = %err, "ledger mark failed");
    }
}
