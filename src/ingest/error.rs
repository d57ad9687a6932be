//! Error types for streaming ingestion

use thiserror::Error;

use crate::store::StoreError;

/// Errors raised while ingesting items
#[derive(Error, Debug)]
pub enum IngestError {
    /// Store error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid file pattern
    #[error("Invalid file pattern: {0}")]
    InvalidPattern(String),

    /// One delivered item could not be read; the source itself is intact
    #[error("Failed to read {rel_filepath}: {reason}")]
    ItemUnreadable { rel_filepath: String, reason: String },

    /// Item source failure
    #[error("Item source error: {0}")]
    Source(String),

    /// Manifest could not be read
    #[error("Failed to load manifest {path}: {reason}")]
    Manifest { path: String, reason: String },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A worker thread panicked
    #[error("Worker {0} panicked")]
    WorkerPanicked(usize),
}

impl IngestError {
    /// Whether the error affects a single item rather than the whole source
    pub fn is_item_error(&self) -> bool {
        matches!(self, IngestError::ItemUnreadable { .. })
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            IngestError::Store(e) => e.user_message(),
            IngestError::InvalidPattern(p) => {
                format!("Invalid file pattern: {p}\n\nHint: Use glob syntax such as '**/*.bmp'.")
            }
            _ => self.to_string(),
        }
    }
}

impl From<duckdb::Error> for IngestError {
    fn from(err: duckdb::Error) -> Self {
        IngestError::Store(StoreError::from(err))
    }
}
