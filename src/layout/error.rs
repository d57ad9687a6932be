//! Errors raised while loading layouts and synthesizing tables

use thiserror::Error;

/// Configuration and table synthesis errors
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The layout file could not be read
    #[error("Failed to read layout file {path}: {reason}")]
    Io { path: String, reason: String },

    /// The layout file could not be parsed
    #[error("Failed to parse layout configuration: {0}")]
    Parse(String),

    /// A column directive token is not recognised
    #[error("Invalid directive '{token}' on column '{column}' of layout '{layout}'")]
    InvalidDirective {
        layout: String,
        column: String,
        token: String,
    },

    /// A foreign-key directive does not have the `fk-<table>.<column>` shape
    #[error("Malformed foreign key '{token}' on column '{column}' of layout '{layout}'")]
    MalformedForeignKey {
        layout: String,
        column: String,
        token: String,
    },

    /// A layout has an empty table name
    #[error("Layout '{0}' has an empty table name")]
    EmptyTableName(String),

    /// Two layouts map to the same table
    #[error("Table '{0}' is declared by more than one layout")]
    DuplicateTable(String),

    /// A foreign key points at a table that has not been synthesized
    #[error("Column '{column}' of table '{table}' references unknown table '{target}'")]
    UnresolvableForeignKey {
        table: String,
        column: String,
        target: String,
    },

    /// The primary-key column is ignored or never observed
    #[error("Primary key '{column}' of table '{table}' has no values")]
    UndefinedPrimaryKey { table: String, column: String },

    /// A not-null column was never observed
    #[error("Required column '{column}' of table '{table}' has no values")]
    UndefinedRequiredColumn { table: String, column: String },

    /// No layout with the given name is configured
    #[error("Unknown layout '{0}'")]
    UnknownLayout(String),
}

impl SchemaError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            SchemaError::InvalidDirective { .. } => format!(
                "{self}\n\nHint: Valid directives are ignore, not_null, unique, \
                 fk-<table>.<column>, astype-datetime and range-midpoint."
            ),
            SchemaError::UnresolvableForeignKey { .. } => format!(
                "{self}\n\nHint: Foreign keys may only reference tables of earlier layouts."
            ),
            _ => self.to_string(),
        }
    }
}
