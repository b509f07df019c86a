//! Error types shared by the deck store, option set and study session.

use thiserror::Error;

/// Failure talking to the key-value backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StudyError {
    /// Rejected user input. Nothing was changed.
    #[error("{0}")]
    Validation(String),
    /// Target deck or card no longer exists.
    #[error("Not found: {0}")]
    NotFound(String),
    /// Operation not allowed in the current session phase.
    #[error("Invalid session state: {0}")]
    InvalidState(&'static str),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl StudyError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

pub type StudyResult<T> = Result<T, StudyError>;
