//! Declarative migration step catalog.
//!
//! Each step is a tagged descriptor interpreted by [`crate::migrate`].
//! Names are the stable ledger keys; never rename one once it has shipped,
//! or every deployment will re-run the step.

use serde::Serialize;

/// Column type for added columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnType {
    VarChar(u32),
    Text,
}

impl ColumnType {
    pub fn sql(&self) -> String {
        match self {
            ColumnType::VarChar(width) => format!("VARCHAR({width})"),
            ColumnType::Text => "TEXT".to_string(),
        }
    }
}

/// One schema change, gated by the ledger under `name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MigrationStep {
    AddColumn {
        name: &'static str,
        table: &'static str,
        column: &'static str,
        ty: ColumnType,
    },
    DropColumn {
        name: &'static str,
        table: &'static str,
        column: &'static str,
    },
    /// Widen a VARCHAR column. No-op on backends that cannot widen.
    WidenColumn {
        name: &'static str,
        table: &'static str,
        column: &'static str,
        width: u32,
    },
    /// Bulk-rewrite a string value to its current canonical form.
    RewriteValues {
        name: &'static str,
        table: &'static str,
        column: &'static str,
        from: &'static str,
        to: &'static str,
    },
}

impl MigrationStep {
    /// Ledger key for this step.
    pub fn name(&self) -> &'static str {
        match self {
            MigrationStep::AddColumn { name, .. }
            | MigrationStep::DropColumn { name, .. }
            | MigrationStep::WidenColumn { name, .. }
            | MigrationStep::RewriteValues { name, .. } => name,
        }
    }

    pub fn is_rewrite(&self) -> bool {
        matches!(self, MigrationStep::RewriteValues { .. })
    }
}

/// Every step the subsystem owns, in execution order.
pub const CATALOG: &[MigrationStep] = &[
    // Specialty columns rolled out with the multi-specialty expansion.
    MigrationStep::AddColumn {
        name: "add_job_review_specialty",
        table: "job_review",
        column: "specialty",
        ty: ColumnType::VarChar(100),
    },
    MigrationStep::AddColumn {
        name: "add_resident_profile_medical_specialty",
        table: "resident_profile",
        column: "medical_specialty",
        ty: ColumnType::VarChar(100),
    },
    MigrationStep::AddColumn {
        name: "add_employer_profile_medical_specialty",
        table: "employer_profile",
        column: "medical_specialty",
        ty: ColumnType::VarChar(100),
    },
    MigrationStep::AddColumn {
        name: "add_forum_post_specialty",
        table: "forum_post",
        column: "specialty",
        ty: ColumnType::VarChar(100),
    },
    MigrationStep::AddColumn {
        name: "add_program_review_specialty",
        table: "program_review",
        column: "specialty",
        ty: ColumnType::VarChar(100),
    },
    MigrationStep::AddColumn {
        name: "add_user_timezone",
        table: "user",
        column: "timezone",
        ty: ColumnType::VarChar(50),
    },
    MigrationStep::AddColumn {
        name: "add_forum_post_photos",
        table: "forum_post",
        column: "photos",
        ty: ColumnType::Text,
    },
    MigrationStep::AddColumn {
        name: "add_forum_comment_photos",
        table: "forum_comment",
        column: "photos",
        ty: ColumnType::Text,
    },
    MigrationStep::AddColumn {
        name: "add_residency_swap_additional_info",
        table: "residency_swap",
        column: "additional_info",
        ty: ColumnType::Text,
    },
    // Retired columns.
    MigrationStep::DropColumn {
        name: "drop_employer_profile_modalities",
        table: "employer_profile",
        column: "modalities",
    },
    MigrationStep::DropColumn {
        name: "drop_residency_swap_preferred_start_date",
        table: "residency_swap",
        column: "preferred_start_date",
    },
    // Free-text specialty entry needs more room than the picker did.
    MigrationStep::WidenColumn {
        name: "widen_residency_swap_current_specialty",
        table: "residency_swap",
        column: "current_specialty",
        width: 200,
    },
    MigrationStep::WidenColumn {
        name: "widen_residency_swap_desired_specialty",
        table: "residency_swap",
        column: "desired_specialty",
        width: 200,
    },
    MigrationStep::WidenColumn {
        name: "widen_job_review_specialty",
        table: "job_review",
        column: "specialty",
        width: 200,
    },
    // Brand rename: Teleradiology practice entries became Telemedicine.
    MigrationStep::RewriteValues {
        name: "rewrite_job_review_practice_type_telemedicine",
        table: "job_review",
        column: "practice_type",
        from: "Teleradiology",
        to: "Telemedicine",
    },
    MigrationStep::RewriteValues {
        name: "rewrite_employer_profile_practice_setting_telemedicine",
        table: "employer_profile",
        column: "practice_setting",
        from: "Teleradiology",
        to: "Telemedicine",
    },
    MigrationStep::RewriteValues {
        name: "rewrite_compensation_data_practice_type_telemedicine",
        table: "compensation_data",
        column: "practice_type",
        from: "Teleradiology",
        to: "Telemedicine",
    },
];

/// Column-level steps, run before enum repair.
pub fn column_steps() -> impl Iterator<Item = &'static MigrationStep> {
    CATALOG.iter().filter(|step| !step.is_rewrite())
}

/// Value-rewrite steps, run after enum repair.
pub fn rewrite_steps() -> impl Iterator<Item = &'static MigrationStep> {
    CATALOG.iter().filter(|step| step.is_rewrite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn step_names_are_unique() {
        let names: BTreeSet<_> = CATALOG.iter().map(|s| s.name()).collect();
        assert_eq!(names.len(), CATALOG.len());
    }

    #[test]
    fn catalog_partitions_cleanly() {
        let split = column_steps().count() + rewrite_steps().count();
        assert_eq!(split, CATALOG.len());
    }

    #[test]
    fn identifiers_in_catalog_are_valid() {
        use crate::backend::validate_identifier;
        for step in CATALOG {
            match *step {
                MigrationStep::AddColumn { table, column, .. }
                | MigrationStep::DropColumn { table, column, .. }
                | MigrationStep::WidenColumn { table, column, .. }
                | MigrationStep::RewriteValues { table, column, .. } => {
                    validate_identifier(table).unwrap();
                    validate_identifier(column).unwrap();
                }
            }
        }
    }
}
