//! # nostr-ingest
//!
//! The ingestion core of a Nostr relay: it decides whether an inbound event
//! may enter storage and, if so, how storage changes.
//!
//! ## Overview
//!
//! - **Acceptance**: timestamp skew, protected events, delegation, relay list
//!   structure, allow/block lists, and content size, checked in that order
//! - **Storage**: ephemeral kinds skip storage, replaceable kinds keep only
//!   the newest event per slot, everything else is inserted once
//! - **Notification**: saved report events are forwarded to Pushover
//! - **Admin**: `/info`, `/reload`, and the NIP-11 document over HTTP
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use nostr_ingest::{AuthContext, IngestResult, Limits, Relay};
//! use nostr_ingest::core::Event;
//! use nostr_ingest::store::{PoolSettings, SqliteStore};
//!
//! async fn example(event: Event) {
//!     let store = SqliteStore::open("nostr-relay.sqlite", PoolSettings::default()).unwrap();
//!     let relay = Relay::new(Arc::new(store), Limits::default());
//!     relay.reload_access_lists().await;
//!
//!     match relay.ingest(&event, &AuthContext::anonymous()).await.unwrap() {
//!         IngestResult::Rejected { reason } => println!("rejected: {reason}"),
//!         IngestResult::Published(outcome) => println!("published: {outcome:?}"),
//!     }
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `nostr_ingest::core` - Events, kinds, and signatures
//! - `nostr_ingest::store` - Storage abstraction, SQLite and memory backends
//! - `nostr_ingest::perms` - Delegation and allow/block lists

pub mod admin;
pub mod config;
pub mod error;
pub mod info;
pub mod notify;
pub mod policy;
pub mod publish;
pub mod relay;

// Re-export component crates
pub use nostr_ingest_core as core;
pub use nostr_ingest_perms as perms;
pub use nostr_ingest_store as store;

// Re-export main types for convenience
pub use config::{load_config, Config, ConfigError};
pub use error::{NotifyError, PublishError, RelayError, Result};
pub use info::{InfoConfig, RelayInformation, RelayStats, VERSION};
pub use notify::{Dispatch, Notification, NotificationHook, NotifyConfig, PushoverDispatch, Report};
pub use policy::{AcceptancePolicy, AuthContext, Decision, Limits, Rejection};
pub use publish::{PublishOutcome, StorageReplacer};
pub use relay::{IngestResult, Relay, StoreListSource};
