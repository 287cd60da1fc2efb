//! # nostr-ingest perms
//!
//! Publishing permissions: delegated signing and the allow/block lists.
//!
//! ## Key Concepts
//!
//! - **Delegation**: An author signs on behalf of a delegator who granted
//!   them a conditions string (kinds and a time window)
//! - **Block list**: Authors whose events are always rejected
//! - **Allow list**: When non-empty, only these authors may publish
//!
//! Block beats allow. Both lists are swapped atomically on reload.

pub mod access;
pub mod delegation;
pub mod error;

pub use access::{AccessListSource, AccessLists, AccessSnapshot};
pub use delegation::{
    delegation_is_valid, validate_delegation, Condition, Conditions, Delegation, DELEGATION_TAG,
};
pub use error::{PermsError, Result};
