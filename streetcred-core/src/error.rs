//! Error types for the streetcred core library.
//!
//! Game-facing store operations never surface these; they degrade to
//! defaults and log. Errors escape only from the persistence layer,
//! configuration loading and explicit [`crate::MemoryStore::flush`].

use thiserror::Error;

/// Top-level error type for fallible streetcred operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// `SQLite` persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A snapshot was written by a newer schema than this build understands.
    #[error("Unsupported snapshot version {found} (supported: {supported})")]
    UnsupportedVersion {
        /// Version found in the snapshot.
        found: u32,
        /// Highest version this build reads.
        supported: u32,
    },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, StoreError>;
