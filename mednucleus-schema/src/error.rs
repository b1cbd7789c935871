//! Error types for the schema-evolution subsystem.
//!
//! Every component boundary catches these and converts them into a status
//! flag plus a log record; the boot sequencer never propagates them.

use thiserror::Error;

/// Result alias for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors surfaced by backends and the components built on them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Database URL is not set")]
    DatabaseUrlMissing,

    #[error("Unsupported database URL scheme: {scheme}")]
    UnsupportedBackend { scheme: String },

    #[error("Failed to connect: {reason}")]
    ConnectFailed { reason: String },

    #[error("Statement failed: {reason}")]
    StatementFailed { reason: String },

    #[error("Invalid identifier: {ident}")]
    InvalidIdentifier { ident: String },
}

impl SchemaError {
    pub fn connect(reason: impl Into<String>) -> Self {
        SchemaError::ConnectFailed {
            reason: reason.into(),
        }
    }

    pub fn statement(reason: impl Into<String>) -> Self {
        SchemaError::StatementFailed {
            reason: reason.into(),
        }
    }

    /// Backend error text, lowercased, for the two places that sniff
    /// driver messages (duplicate enum member, duplicate ledger row).
    pub fn message_lowercase(&self) -> String {
        self.to_string().to_lowercase()
    }
}
