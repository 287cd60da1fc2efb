//! # nostr-ingest testkit
//!
//! Testing utilities for the ingestion core.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Vectors**: Known-answer cases for delegation and relay list validation
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Helper structs producing signed events of every shape
//!
//! ## Vectors
//!
//! ```rust
//! use nostr_ingest_testkit::vectors::{delegation_vectors, event_from_delegation_vector};
//!
//! for vector in delegation_vectors() {
//!     let event = event_from_delegation_vector(&vector);
//!     println!("{}: {}", vector.name, event.id);
//! }
//! ```
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use nostr_ingest_testkit::generators::{event_from_params, EventParams};
//!
//! proptest! {
//!     #[test]
//!     fn event_id_is_deterministic(params: EventParams) {
//!         let e1 = event_from_params(&params);
//!         let e2 = event_from_params(&params);
//!         prop_assert_eq!(e1.id, e2.id);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use nostr_ingest_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let note = fixture.make_text_note("hello");
//! assert!(note.verify().is_ok());
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_fixtures, now, TestFixture, BASE_TIME};
pub use generators::{event_from_params, EventParams};
pub use vectors::{
    delegation_vectors, event_from_delegation_vector, event_from_relay_list_vector,
    relay_list_vectors, DelegationVector, RelayListVector,
};
