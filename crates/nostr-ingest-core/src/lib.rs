//! # nostr-ingest core
//!
//! Pure primitives for the ingestion core: events, tags, kind classes, and
//! the cryptography needed to check delegated authorship.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Event`] - A signed protocol event
//! - [`Tag`] - Ordered string list; element 0 is the name
//! - [`KindClass`] - Storage class derived from the kind number
//! - [`ReplacementKey`] - The slot a replaceable event competes for
//! - [`EventId`] / [`PublicKey`] - Hex identifiers
//!
//! ## Canonicalization
//!
//! Event ids hash the compact JSON array described in [`canonical`].

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod event;
pub mod kind;
pub mod types;
pub mod validation;

pub use canonical::{compute_event_id, delegation_digest, delegation_token, DELEGATION_PREFIX};
pub use crypto::{verify_schnorr, Keypair, Sha256Hash};
pub use error::{CoreError, ValidationError};
pub use event::{Event, EventBuilder, Tag, PROTECTED_TAG};
pub use kind::{
    d_tag_value, supersedes, KindClass, ReplacementKey, KIND_CONTACTS, KIND_METADATA,
    KIND_RELAY_LIST, KIND_REPORT, D_TAG,
};
pub use types::{EventId, PublicKey};
pub use validation::{validate_kind_structure, validate_relay_list};
