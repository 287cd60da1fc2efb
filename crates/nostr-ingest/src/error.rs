//! Error types for the relay facade.

use nostr_ingest_store::StoreError;
use thiserror::Error;

/// Failures behind the admin statistics and other read paths.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Why an accepted event could not be committed.
///
/// Duplicates and stale replacements are outcomes, not errors.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The backend failed; nothing was retried.
    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}

/// Report delivery failures. Logged by the worker, never surfaced to publishers.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Request could not be sent or the response not read.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status.
    #[error("notification endpoint returned status {0}")]
    Status(u16),
}

/// Result type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
