//! Error types for the core crate.

use thiserror::Error;

use crate::types::EventId;

/// Core errors that can occur during event operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid secret key")]
    InvalidSecretKey,

    #[error("event id mismatch: expected {expected}, got {actual}")]
    IdMismatch { expected: EventId, actual: EventId },

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Structural validation failures for kind-specific event bodies.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("relay list content must be empty")]
    RelayListContent,

    #[error("relay list tag {index} has no url")]
    RelayListMissingUrl { index: usize },

    #[error("relay list url {url:?} is not a websocket url")]
    RelayListScheme { url: String },
}
