//! Per-record normalization errors

use thiserror::Error;

use crate::inference::CanonicalType;

/// A record that cannot be turned into a canonical row
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizationError {
    /// A not-null or primary-key column is absent
    #[error("Required column '{column}' is missing")]
    MissingRequired { column: String },

    /// A value does not parse as the column's type
    #[error("Cannot cast '{value}' in column '{column}' to {target}")]
    Cast {
        column: String,
        value: String,
        target: CanonicalType,
    },

    /// A declared value transform could not be applied
    #[error("Cannot transform '{value}' in column '{column}': {reason}")]
    Transform {
        column: String,
        value: String,
        reason: String,
    },

    /// A populated field has no column in the synthesized table
    #[error("Column '{column}' has no synthesized type for value '{value}'")]
    UnknownColumn { column: String, value: String },
}

impl NormalizationError {
    /// The column the error refers to
    pub fn column(&self) -> &str {
        match self {
            NormalizationError::MissingRequired { column }
            | NormalizationError::Cast { column, .. }
            | NormalizationError::Transform { column, .. }
            | NormalizationError::UnknownColumn { column, .. } => column,
        }
    }
}
