//! Error types for lipgrate.

use thiserror::Error;

use crate::dialect::Dialect;

/// The main error type for migration runs.
///
/// Every variant aborts the current run. An empty ledger on rollback is not an
/// error; it is reported as [`crate::runner::RollbackOutcome::NothingToRollback`].
#[derive(Debug, Error)]
pub enum MigrateError {
    /// Missing or unusable configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A file in the migrations directory does not carry the required prefix.
    #[error(
        "Invalid migration file name: '{file}'. Use `lipgrate create <name>` to generate migrations."
    )]
    NamingConvention { file: String },

    /// An operation is missing required fields.
    #[error("Invalid schema for {operation}: missing required field(s): {}", .missing.join(", "))]
    SchemaValidation {
        operation: &'static str,
        missing: Vec<&'static str>,
    },

    /// A column definition string could not be parsed.
    #[error("Invalid column definition '{definition}': {reason}")]
    InvalidColumnDefinition { definition: String, reason: String },

    /// The type name is not known to the active dialect.
    #[error("Unknown data type '{type_name}'.{}", .suggestion.as_ref().map(|s| format!(" Did you mean '{}'?", s)).unwrap_or_default())]
    UnknownType {
        type_name: String,
        suggestion: Option<String>,
    },

    /// The operation cannot be expressed in the active dialect.
    #[error("{}", unsupported_message(.operation, .dialect, .reason))]
    UnsupportedOperation {
        operation: String,
        dialect: Dialect,
        reason: Option<&'static str>,
    },

    /// The database rejected a statement.
    #[error("Execution error: {message}\n  while executing: {sql}")]
    Execution { sql: String, message: String },

    /// Connecting to the database failed.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A migration file could not be read or parsed.
    #[error("Failed to load migration '{file}': {message}")]
    MigrationLoad { file: String, message: String },

    /// A ledger entry has no matching migration.
    #[error("Migration '{0}' is recorded as applied but no longer exists in the migrations directory")]
    MissingMigration(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn unsupported_message(operation: &str, dialect: &Dialect, reason: &Option<&'static str>) -> String {
    match reason {
        Some(reason) => format!("`{}` is not supported in {}. {}", operation, dialect.display_name(), reason),
        None => format!(
            "Unsupported migration operation '{}' for client '{}'.",
            operation, dialect
        ),
    }
}

impl MigrateError {
    /// Create a schema validation error.
    pub fn schema(operation: &'static str, missing: Vec<&'static str>) -> Self {
        Self::SchemaValidation { operation, missing }
    }

    /// Create an unsupported-operation error without a dialect-specific reason.
    pub fn unsupported(operation: impl Into<String>, dialect: Dialect) -> Self {
        Self::UnsupportedOperation {
            operation: operation.into(),
            dialect,
            reason: None,
        }
    }

    /// Create an execution error for the given statement.
    pub fn execution(sql: &str, message: impl ToString) -> Self {
        Self::Execution {
            sql: sql.trim().to_string(),
            message: message.to_string(),
        }
    }
}

/// Result type alias for lipgrate operations.
pub type MigrateResult<T> = Result<T, MigrateError>;
