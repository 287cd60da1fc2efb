//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Could not obtain a pooled connection.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Event serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// `created_at` does not fit SQLite's signed 64-bit integer.
    #[error("created_at {0} is out of range for storage")]
    TimestampOutOfRange(u64),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Backend driver name not recognized.
    #[error("unsupported database driver: {0:?}")]
    UnsupportedDriver(String),

    /// A blocking task panicked or was cancelled.
    #[error("blocking task failed: {0}")]
    Task(String),

    /// An in-memory lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
