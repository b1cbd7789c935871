//! Scripted in-memory backend for unit tests.
//!
//! Understands exactly the statement shapes the subsystem emits (ledger
//! insert, column DDL, enum member addition, value rewrite) and mutates a
//! simple in-memory picture of the schema. Lets tests exercise
//! PostgreSQL-only paths (enum repair, duplicate-member races, forced
//! per-member failures) without a server.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{BackendFamily, SchemaBackend};
use crate::error::{SchemaError, SchemaResult};

#[derive(Default)]
struct MockState {
    columns: BTreeMap<(String, String), String>,
    enum_types: BTreeMap<String, BTreeSet<String>>,
    rows: BTreeMap<(String, String), BTreeMap<String, u64>>,
    ledger: BTreeSet<String>,
    statements: Vec<String>,
    fail_ping: bool,
    fail_members: BTreeSet<String>,
    fail_tables: BTreeSet<String>,
}

pub struct MockBackend {
    family: BackendFamily,
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn postgres() -> Self {
        Self {
            family: BackendFamily::Postgres,
            state: Mutex::new(MockState::default()),
        }
    }

    pub fn with_column(self, table: &str, column: &str, ty: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .columns
            .insert((table.into(), column.into()), ty.to_lowercase());
        self
    }

    pub fn with_enum(self, type_name: &str, members: &[&str]) -> Self {
        self.state.lock().unwrap().enum_types.insert(
            type_name.into(),
            members.iter().map(|m| m.to_string()).collect(),
        );
        self
    }

    pub fn with_rows(self, table: &str, column: &str, value: &str, count: u64) -> Self {
        self.state
            .lock()
            .unwrap()
            .rows
            .entry((table.into(), column.into()))
            .or_default()
            .insert(value.into(), count);
        self
    }

    /// Refuse `ALTER TYPE ... ADD VALUE` for this member with a
    /// non-duplicate error.
    pub fn fail_member(self, member: &str) -> Self {
        self.state.lock().unwrap().fail_members.insert(member.into());
        self
    }

    /// Refuse any `ALTER TABLE` against this table.
    pub fn fail_table(self, table: &str) -> Self {
        self.state.lock().unwrap().fail_tables.insert(table.into());
        self
    }

    pub fn fail_ping(self) -> Self {
        self.state.lock().unwrap().fail_ping = true;
        self
    }

    /// Every statement executed so far, in order.
    pub fn statements(&self) -> Vec<String> {
        self.state.lock().unwrap().statements.clone()
    }

    pub fn ledger_names(&self) -> BTreeSet<String> {
        self.state.lock().unwrap().ledger.clone()
    }

    pub fn row_count(&self, table: &str, column: &str, value: &str) -> u64 {
        self.state
            .lock()
            .unwrap()
            .rows
            .get(&(table.into(), column.into()))
            .and_then(|values| values.get(value).copied())
            .unwrap_or(0)
    }

    /// Simulate another process adding the member between our probe and
    /// our `ADD VALUE`.
    pub fn inject_member(&self, type_name: &str, member: &str) {
        self.state
            .lock()
            .unwrap()
            .enum_types
            .entry(type_name.into())
            .or_default()
            .insert(member.into());
    }

    fn apply_table_ddl(state: &mut MockState, sql: &str) -> SchemaResult<()> {
        let tokens: Vec<String> = sql.split_whitespace().map(unquote).collect();
        // ALTER TABLE <t> ADD COLUMN <c> <type...>
        // ALTER TABLE <t> DROP COLUMN <c>
        // ALTER TABLE <t> ALTER COLUMN <c> TYPE <type>
        if tokens.len() < 6 {
            return Err(SchemaError::statement(format!("unrecognized ddl: {sql}")));
        }
        let table = tokens[2].clone();
        if state.fail_tables.contains(&table) {
            return Err(SchemaError::statement(format!(
                "permission denied for table {table}"
            )));
        }
        let column = tokens[5].clone();
        match (tokens[3].to_uppercase().as_str(), tokens[4].to_uppercase().as_str()) {
            ("ADD", "COLUMN") => {
                let ty = tokens[6..].join(" ").to_lowercase();
                state.columns.insert((table, column), ty);
                Ok(())
            }
            ("DROP", "COLUMN") => {
                state.columns.remove(&(table, column));
                Ok(())
            }
            ("ALTER", "COLUMN") => {
                let ty = tokens[7..].join(" ").to_lowercase();
                state.columns.insert((table, column), ty);
                Ok(())
            }
            _ => Err(SchemaError::statement(format!("unrecognized ddl: {sql}"))),
        }
    }
}

fn unquote(token: &str) -> String {
    token.trim_matches('"').to_string()
}

/// First and second single-quoted literal in the statement.
fn literals(sql: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = sql;
    while let Some(start) = rest.find('\'') {
        let tail = &rest[start + 1..];
        match tail.find('\'') {
            Some(end) => {
                out.push(tail[..end].to_string());
                rest = &tail[end + 1..];
            }
            None => break,
        }
    }
    out
}

#[async_trait]
impl SchemaBackend for MockBackend {
    fn family(&self) -> BackendFamily {
        self.family
    }

    async fn ping(&self) -> SchemaResult<()> {
        if self.state.lock().unwrap().fail_ping {
            Err(SchemaError::connect("connection refused"))
        } else {
            Ok(())
        }
    }

    async fn column_exists(&self, table: &str, column: &str) -> SchemaResult<bool> {
        let state = self.state.lock().unwrap();
        Ok(state.columns.contains_key(&(table.into(), column.into())))
    }

    async fn column_type(&self, table: &str, column: &str) -> SchemaResult<Option<String>> {
        let state = self.state.lock().unwrap();
        Ok(state.columns.get(&(table.into(), column.into())).cloned())
    }

    async fn enum_type_exists(&self, type_name: &str) -> SchemaResult<bool> {
        Ok(self.state.lock().unwrap().enum_types.contains_key(type_name))
    }

    async fn enum_members(&self, type_name: &str) -> SchemaResult<BTreeSet<String>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .enum_types
            .get(type_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn execute_ddl(&self, sql: &str) -> SchemaResult<()> {
        let mut state = self.state.lock().unwrap();
        state.statements.push(sql.to_string());
        let upper = sql.trim().to_uppercase();
        if upper.starts_with("CREATE TABLE") {
            return Ok(());
        }
        if upper.starts_with("ALTER TABLE") {
            return MockBackend::apply_table_ddl(&mut state, sql);
        }
        Err(SchemaError::statement(format!("unrecognized ddl: {sql}")))
    }

    async fn execute_autocommit(&self, sql: &str) -> SchemaResult<u64> {
        let mut state = self.state.lock().unwrap();
        state.statements.push(sql.to_string());
        let upper = sql.trim().to_uppercase();

        if upper.starts_with("ALTER TYPE") {
            let type_name = sql
                .split_whitespace()
                .nth(2)
                .map(unquote)
                .unwrap_or_default();
            let member = literals(sql)
                .into_iter()
                .next()
                .ok_or_else(|| SchemaError::statement("missing member literal"))?;
            if state.fail_members.contains(&member) {
                return Err(SchemaError::statement(format!(
                    "could not add enum value \"{member}\": disk full"
                )));
            }
            let members = state.enum_types.entry(type_name).or_default();
            if members.contains(&member) {
                return Err(SchemaError::statement(format!(
                    "enum label \"{member}\" already exists"
                )));
            }
            members.insert(member);
            return Ok(0);
        }

        if upper.starts_with("UPDATE") {
            let tokens: Vec<String> = sql.split_whitespace().map(|t| unquote(t)).collect();
            let table = tokens.get(1).cloned().unwrap_or_default();
            let column = tokens.get(3).cloned().unwrap_or_default();
            let lits = literals(sql);
            let (to, from) = match (lits.first(), lits.get(1)) {
                (Some(to), Some(from)) => (to.clone(), from.clone()),
                _ => return Err(SchemaError::statement("missing update literals")),
            };
            let values = state.rows.entry((table, column)).or_default();
            let moved = values.remove(&from).unwrap_or(0);
            if moved > 0 {
                *values.entry(to).or_insert(0) += moved;
            }
            return Ok(moved);
        }

        if upper.starts_with("INSERT INTO MIGRATIONS") {
            let name = literals(sql)
                .into_iter()
                .next()
                .ok_or_else(|| SchemaError::statement("missing ledger name"))?;
            if !state.ledger.insert(name) {
                return Err(SchemaError::statement(
                    "duplicate key value violates unique constraint \"migrations_name_key\"",
                ));
            }
            return Ok(1);
        }

        Err(SchemaError::statement(format!("unrecognized statement: {sql}")))
    }

    async fn query_count(&self, sql: &str) -> SchemaResult<i64> {
        let state = self.state.lock().unwrap();
        if sql.contains("FROM migrations") {
            let name = literals(sql)
                .into_iter()
                .next()
                .ok_or_else(|| SchemaError::statement("missing ledger name"))?;
            return Ok(i64::from(state.ledger.contains(&name)));
        }
        Err(SchemaError::statement(format!("unrecognized query: {sql}")))
    }
}
