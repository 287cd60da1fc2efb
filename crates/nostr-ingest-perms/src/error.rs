//! Error types for the permissions module.

use thiserror::Error;

/// Errors that can occur during permission checks.
#[derive(Debug, Error)]
pub enum PermsError {
    /// Delegation tag is structurally invalid.
    #[error("malformed delegation: {0}")]
    MalformedDelegation(String),

    /// Conditions string does not parse.
    #[error("invalid delegation conditions: {0:?}")]
    InvalidConditions(String),

    /// Conditions do not cover this event.
    #[error("delegation does not permit kind {kind} at {created_at}")]
    DelegationForbidden { kind: u32, created_at: u64 },

    /// Delegator signature does not verify.
    #[error("invalid delegation signature")]
    InvalidDelegationSignature,

    /// Access lists could not be read.
    #[error("failed to load access lists: {0}")]
    AccessListLoad(String),

    /// Core error.
    #[error("core error: {0}")]
    CoreError(#[from] nostr_ingest_core::CoreError),
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, PermsError>;
