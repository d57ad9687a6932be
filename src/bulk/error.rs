//! Error types for bulk conversion

use thiserror::Error;

use crate::layout::SchemaError;
use crate::normalize::NormalizationError;
use crate::store::StoreError;

/// Errors that abort a conversion run
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Store error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Layout or synthesis error
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The record source failed
    #[error("Failed to fetch layout '{layout}': {reason}")]
    Source { layout: String, reason: String },

    /// The target table exists and dropping was not requested
    #[error("Table '{0}' already exists")]
    TableExists(String),

    /// A record could not be normalized (strict mode)
    #[error("Record {record} of layout '{layout}' is invalid: {source}")]
    Normalization {
        layout: String,
        record: usize,
        #[source]
        source: NormalizationError,
    },

    /// A batch insert failed and was rolled back
    #[error("Failed to insert {rows} rows into '{table}': {reason}")]
    BulkInsert {
        table: String,
        rows: usize,
        reason: String,
    },
}

impl ConvertError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            ConvertError::Store(e) => e.user_message(),
            ConvertError::Schema(e) => e.user_message(),
            ConvertError::TableExists(table) => format!(
                "Table '{table}' already exists.\n\nHint: Pass --drop-existing to recreate it."
            ),
            ConvertError::Normalization { .. } => format!(
                "{self}\n\nHint: Run without --strict to skip invalid records."
            ),
            _ => self.to_string(),
        }
    }
}

impl From<duckdb::Error> for ConvertError {
    fn from(err: duckdb::Error) -> Self {
        ConvertError::Store(StoreError::from(err))
    }
}
