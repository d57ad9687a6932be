//! Error types for store operations

use thiserror::Error;

/// Errors raised by the store handle and its sessions
#[derive(Error, Debug)]
pub enum StoreError {
    /// The database could not be opened or reached
    #[error("Failed to connect to store at {target}: {reason}")]
    Connection { target: String, reason: String },

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// A worker tried to check out a second session
    #[error("Worker {0} already holds a session")]
    SessionInUse(usize),

    /// The session pool has been shut down
    #[error("Session pool is shut down")]
    PoolClosed,

    /// The store handle has been disposed
    #[error("Store has been disposed")]
    Disposed,

    /// The write lock was poisoned by a panicking worker
    #[error("Store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            StoreError::Connection { target, reason } => {
                format!(
                    "Cannot open the store at {target}.\nReason: {reason}\n\n\
                    Hint: Check the database path and its permissions."
                )
            }
            StoreError::SessionInUse(worker) => {
                format!("Worker {worker} tried to open a second store session.")
            }
            _ => self.to_string(),
        }
    }
}

impl From<duckdb::Error> for StoreError {
    fn from(err: duckdb::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}
