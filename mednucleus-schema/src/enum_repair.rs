//! Enum repair engine for PostgreSQL enumerated types.
//!
//! Brings the backend catalog of a managed enumerated type up to the
//! required member set, retiring legacy members by rewriting their rows
//! first. State machine per type:
//!
//! absent type      -> terminal no-op (embedded backend, fresh database)
//! legacy members   -> extend mapping targets, then rewrite rows
//! missing members  -> add each in lexicographic order, one per
//!                     autocommit transaction
//! verify           -> re-probe; report (never raise) if still short
//!
//! The one-member-per-transaction rule is the load-bearing contract here:
//! `ALTER TYPE ... ADD VALUE` cannot share a transaction with other
//! statements on the server versions we support, so each addition goes
//! through [`SchemaBackend::execute_autocommit`] and commits on its own.
//! A concurrent boot racing us onto the same member loses with a
//! duplicate-member error, which is normalized to success in exactly one
//! place ([`is_duplicate_member`]).

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{error, info, warn};

use mednucleus_core::specialty::{legacy_mapping, required_members, OPPORTUNITY_TYPE_NAME};

use crate::backend::{escape_literal, quote_identifier, validate_identifier, SchemaBackend};
use crate::error::{SchemaError, SchemaResult};

// ============================================================================
// DESCRIPTOR
// ============================================================================

/// Desired state of one managed enumerated type.
#[derive(Debug, Clone)]
pub struct EnumTypeSpec {
    /// Backend type name.
    pub type_name: &'static str,
    /// Members the type must contain, canonical uppercase, sorted.
    pub required: Vec<&'static str>,
    /// Retired member -> current member; rows are rewritten before the
    /// retired member falls out of use. Every target is in `required`.
    pub legacy: Vec<(&'static str, &'static str)>,
    /// Table and column whose rows carry the enum values.
    pub table: &'static str,
    pub column: &'static str,
}

impl EnumTypeSpec {
    /// The one type the application manages today.
    pub fn opportunity_type() -> Self {
        Self {
            type_name: OPPORTUNITY_TYPE_NAME,
            required: required_members(),
            legacy: legacy_mapping().to_vec(),
            table: "opportunity",
            column: "opportunity_type",
        }
    }
}

// ============================================================================
// REPORT
// ============================================================================

/// Result of one repair pass. Never carries backend error text; that goes
/// to the log only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnumRepairReport {
    /// All required members present after the pass (vacuously true when
    /// the type does not exist on this backend).
    pub ok: bool,
    /// False when the type does not exist (embedded backend or a database
    /// whose model layer has not created it yet).
    pub applicable: bool,
    /// Members successfully ensured this pass, including ones another
    /// process added first (duplicate normalized to success).
    pub added: usize,
    /// Rows folded from legacy members onto current ones.
    pub rewritten_rows: u64,
    /// Members whose addition failed with a non-duplicate error.
    pub failed: Vec<String>,
    /// Membership after the pass.
    pub final_members: BTreeSet<String>,
}

impl EnumRepairReport {
    fn not_applicable() -> Self {
        Self {
            ok: true,
            applicable: false,
            ..Self::default()
        }
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// Ensure the enumerated type matches its descriptor.
pub async fn ensure(backend: &dyn SchemaBackend, spec: &EnumTypeSpec) -> EnumRepairReport {
    if validate_identifier(spec.type_name).is_err() {
        error!(type_name = spec.type_name, "invalid enum type name");
        return EnumRepairReport::default();
    }

    match backend.enum_type_exists(spec.type_name).await {
        Ok(false) => {
            info!(type_name = spec.type_name, "enum type absent, repair not applicable");
            return EnumRepairReport::not_applicable();
        }
        Ok(true) => {}
        Err(err) => {
            warn!(type_name = spec.type_name, error = %err, "enum existence probe failed");
            return EnumRepairReport::default();
        }
    }

    let mut members = match backend.enum_members(spec.type_name).await {
        Ok(members) => members,
        Err(err) => {
            error!(type_name = spec.type_name, error = %err, "enum member listing failed");
            return EnumRepairReport::default();
        }
    };
    info!(
        type_name = spec.type_name,
        count = members.len(),
        "current enum membership"
    );

    let mut report = EnumRepairReport {
        applicable: true,
        ..EnumRepairReport::default()
    };

    // Retire legacy members: mapping targets must exist before the row
    // rewrite, so those are extended first.
    let mapping = effective_legacy_mapping(spec, &members);
    if !mapping.is_empty() {
        let targets: BTreeSet<&str> = mapping
            .values()
            .filter(|target| !members.contains(**target))
            .copied()
            .collect();
        for target in targets {
            match add_member(backend, spec.type_name, target).await {
                Ok(_) => {
                    members.insert(target.to_string());
                    report.added += 1;
                }
                Err(err) => {
                    error!(member = target, error = %err, "failed to add mapping target");
                    report.failed.push(target.to_string());
                }
            }
        }

        for (source, target) in &mapping {
            if !members.contains(*target) {
                // Target never made it in; rewriting would violate the
                // column's type constraint.
                continue;
            }
            match rewrite_rows(backend, spec, source, target).await {
                Ok(rows) => {
                    if rows > 0 {
                        info!(source, target, rows, "legacy rows rewritten");
                    }
                    report.rewritten_rows += rows;
                }
                Err(err) => {
                    error!(source, target, error = %err, "legacy rewrite failed");
                }
            }
        }
    }

    // Extend the remaining missing set in lexicographic order so the
    // final backend ordering is reproducible across runs.
    let missing: Vec<&str> = spec
        .required
        .iter()
        .filter(|member| !members.contains(**member))
        .copied()
        .collect();
    for member in missing {
        match add_member(backend, spec.type_name, member).await {
            Ok(AddOutcome::Added) => {
                info!(member, "enum member added");
                report.added += 1;
            }
            Ok(AddOutcome::AlreadyExists) => {
                info!(member, "enum member already present");
                report.added += 1;
            }
            Err(err) => {
                error!(member, error = %err, "failed to add enum member");
                report.failed.push(member.to_string());
            }
        }
    }

    // Verify. A member can still be absent after a partial failure; that
    // is a hard-fail status for the type, not a raised error.
    report.final_members = match backend.enum_members(spec.type_name).await {
        Ok(members) => members,
        Err(err) => {
            error!(type_name = spec.type_name, error = %err, "enum verification failed");
            report.ok = false;
            return report;
        }
    };
    let still_missing: Vec<&&str> = spec
        .required
        .iter()
        .filter(|member| !report.final_members.contains(**member))
        .collect();
    report.ok = still_missing.is_empty();
    if !report.ok {
        warn!(
            type_name = spec.type_name,
            missing = ?still_missing,
            "required members still absent after repair"
        );
    }

    report
}

/// Mapping from each currently-present retired member to its target.
/// Lowercase variants of required members are legacy too and fold onto
/// their uppercase form.
fn effective_legacy_mapping<'a>(
    spec: &'a EnumTypeSpec,
    members: &BTreeSet<String>,
) -> BTreeMap<String, &'a str> {
    let required: BTreeSet<&str> = spec.required.iter().copied().collect();
    let mut mapping = BTreeMap::new();

    for member in members {
        if let Some((_, target)) = spec.legacy.iter().find(|(source, _)| source == member) {
            mapping.insert(member.clone(), *target);
            continue;
        }
        if !required.contains(member.as_str()) {
            let upper = member.to_ascii_uppercase();
            if upper != *member {
                if let Some(target) = required.get(upper.as_str()) {
                    mapping.insert(member.clone(), *target);
                }
            }
        }
    }

    mapping
}

pub(crate) enum AddOutcome {
    Added,
    AlreadyExists,
}

/// Add one member in its own autocommit transaction.
pub(crate) async fn add_member(
    backend: &dyn SchemaBackend,
    type_name: &str,
    member: &str,
) -> SchemaResult<AddOutcome> {
    let sql = format!(
        "ALTER TYPE {type_name} ADD VALUE '{}'",
        escape_literal(member)
    );
    match backend.execute_autocommit(&sql).await {
        Ok(_) => Ok(AddOutcome::Added),
        Err(err) if is_duplicate_member(&err) => Ok(AddOutcome::AlreadyExists),
        Err(err) => Err(err),
    }
}

/// The single place duplicate-member errors are recognized.
fn is_duplicate_member(err: &SchemaError) -> bool {
    err.message_lowercase().contains("already exists")
}

async fn rewrite_rows(
    backend: &dyn SchemaBackend,
    spec: &EnumTypeSpec,
    source: &str,
    target: &str,
) -> SchemaResult<u64> {
    let sql = format!(
        "UPDATE {} SET {} = '{}' WHERE {} = '{}'",
        quote_identifier(spec.table),
        quote_identifier(spec.column),
        escape_literal(target),
        quote_identifier(spec.column),
        escape_literal(source)
    );
    backend.execute_autocommit(&sql).await
}
