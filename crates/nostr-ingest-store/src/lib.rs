//! # nostr-ingest store
//!
//! Storage abstraction for the ingestion core. Provides a trait-based
//! interface for event persistence with SQLite and in-memory implementations.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite storage on an r2d2 pool
//! - [`MemoryStore`] - In-memory storage
//! - [`Backend`] - The closed set of engines selectable from configuration
//! - [`ReplaceResult`] - Outcome of the atomic replace-if-newer step
//!
//! ## Usage
//!
//! ```rust,no_run
//! use nostr_ingest_store::{PoolSettings, SqliteStore, Store};
//!
//! async fn example() {
//!     let store = SqliteStore::open("nostr-relay.sqlite", PoolSettings::default()).unwrap();
//!     let stored = store.count_events().await.unwrap();
//!     println!("{} events", stored);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent inserts**: Inserting the same event twice returns `AlreadyExists`
//! - **Serialized replacement**: `replace_event` runs in an immediate
//!   transaction, so concurrent writers to one slot converge on one survivor
//! - **Access lists**: `allowlist` and `blocklist` tables live beside events

pub mod backend;
pub mod error;
pub mod memory;
pub mod migration;
pub mod pool;
pub mod sqlite;
pub mod traits;

pub use backend::{Backend, Driver, StoreConfig};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use pool::{DbPool, PoolSettings};
pub use sqlite::SqliteStore;
pub use traits::{AuthorList, InsertResult, ReplaceResult, Store, StoreExt, StoreStats};
