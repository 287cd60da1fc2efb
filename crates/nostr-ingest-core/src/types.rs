//! Strong type definitions for event identifiers.
//!
//! Identifiers travel as lowercase hex on the wire and are kept in that form.
//! The newtypes exist so an author key is never passed where an event id is
//! expected. Ordering is plain lexicographic order of the hex text, which is
//! what the replacement tie-break compares.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of a hex-encoded 32-byte value.
pub const HEX_32_LEN: usize = 64;

/// Length of a hex-encoded 64-byte Schnorr signature.
pub const HEX_SIG_LEN: usize = 128;

/// Returns true when `s` is exactly `len` hex characters.
pub fn is_hex_of_len(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Content-addressed event identifier (sha256 of the canonical serialization).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Wrap a hex string without checking it.
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Encode raw digest bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(hex::encode(bytes))
    }

    /// The hex text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for 64 hex characters.
    pub fn is_well_formed(&self) -> bool {
        is_hex_of_len(&self.0, HEX_32_LEN)
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventId({})", self.0.get(..16).unwrap_or(&self.0))
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for EventId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An author's x-only secp256k1 public key in hex.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicKey(String);

impl PublicKey {
    /// Wrap a hex string without checking it.
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Encode raw x-only key bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for 64 hex characters.
    pub fn is_well_formed(&self) -> bool {
        is_hex_of_len(&self.0, HEX_32_LEN)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.0.get(..16).unwrap_or(&self.0))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PublicKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for PublicKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}
