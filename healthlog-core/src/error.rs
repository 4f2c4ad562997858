//! Error types for healthlog-core

use crate::datekey::DateKey;
use crate::types::LogCategory;
use thiserror::Error;

/// Main error type for the healthlog-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input to a write, update or aggregation
    #[error("validation error: {0}")]
    Validation(String),

    /// Update referencing an entry that does not exist for that day
    #[error("log entry not found: {category} {date} {id}")]
    NotFound {
        category: LogCategory,
        date: DateKey,
        id: String,
    },

    /// Persistence collaborator failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding error for stored buckets
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Analyzer failure. Contained by the insight engine, never returned
    /// from `generate`.
    #[error("analyzer {analyzer} failed: {message}")]
    Analyzer { analyzer: String, message: String },
}

impl Error {
    /// Whether this error originated below the store, in persistence.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Error::Storage(_) | Error::Database(_) | Error::Io(_) | Error::Json(_)
        )
    }
}

/// Result type alias for healthlog-core
pub type Result<T> = std::result::Result<T, Error>;
