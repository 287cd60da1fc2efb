//! Store trait: the abstract interface for event persistence.
//!
//! This trait keeps the ingestion core storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests and ephemeral relays).

use async_trait::async_trait;
use nostr_ingest_core::{Event, EventId, PublicKey, ReplacementKey, D_TAG};

use crate::error::Result;

/// Result of inserting an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    /// Event was inserted.
    Inserted,
    /// An event with the same id is already stored (not an error).
    AlreadyExists,
}

/// Result of the atomic replace-if-newer step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplaceResult {
    /// The new event now holds the slot; `replaced` were deleted.
    Inserted {
        /// Previous holders, usually zero or one.
        replaced: Vec<EventId>,
    },
    /// A stored event at least as new holds the slot; nothing changed.
    Stale {
        /// The event that keeps the slot.
        current: EventId,
    },
    /// The exact event is already stored.
    AlreadyExists,
}

/// Which persisted author list to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthorList {
    Allow,
    Block,
}

impl AuthorList {
    pub const fn table(self) -> &'static str {
        match self {
            AuthorList::Allow => "allowlist",
            AuthorList::Block => "blocklist",
        }
    }
}

/// Connection statistics reported on the admin surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Open connections, idle or in use.
    pub open_connections: u32,
    pub idle_connections: u32,
}

/// The Store trait: async interface for event persistence.
///
/// # Design Notes
///
/// - **Idempotent inserts**: Inserting the same event twice returns `AlreadyExists`.
/// - **Atomic replacement**: [`Store::replace_event`] performs the holder
///   lookup, the comparison and the write as one unit that cannot interleave
///   with another writer on the same backing database, including writers in
///   other processes.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Event Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert an event. A pre-existing id reports `AlreadyExists`.
    async fn insert_event(&self, event: &Event) -> Result<InsertResult>;

    /// Store `event` in the slot `key` unless a holder supersedes it.
    ///
    /// Holders that `event` supersedes are deleted in the same unit of work.
    async fn replace_event(&self, event: &Event, key: &ReplacementKey) -> Result<ReplaceResult>;

    /// Delete an event by id. Returns whether a row was removed.
    async fn delete_event(&self, id: &EventId) -> Result<bool>;

    /// Get an event by id.
    async fn get_event(&self, id: &EventId) -> Result<Option<Event>>;

    /// Number of stored events.
    async fn count_events(&self) -> Result<u64>;

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// All stored events by `author` with `kind`, newest first.
    async fn query_by_author_and_kind(&self, author: &PublicKey, kind: u32) -> Result<Vec<Event>>;

    /// Stored events by `author` with `kind` carrying a `tag_name` tag whose
    /// first value is `tag_value`, newest first.
    async fn query_by_author_kind_and_tag(
        &self,
        author: &PublicKey,
        kind: u32,
        tag_name: &str,
        tag_value: &str,
    ) -> Result<Vec<Event>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Access Lists
    // ─────────────────────────────────────────────────────────────────────────

    /// Read every author on a persisted list.
    async fn load_author_list(&self, list: AuthorList) -> Result<Vec<PublicKey>>;

    /// Add an author to a list. Adding twice is a no-op.
    async fn add_author(&self, list: AuthorList, author: &PublicKey) -> Result<()>;

    /// Remove an author from a list. Returns whether it was present.
    async fn remove_author(&self, list: AuthorList, author: &PublicKey) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Statistics
    // ─────────────────────────────────────────────────────────────────────────

    fn stats(&self) -> StoreStats;
}

/// Extension trait for common store patterns.
pub trait StoreExt: Store {
    /// Current holders of a replacement slot.
    ///
    /// Dispatches to the plain or tag-qualified query depending on the key.
    /// Parameterized slots with an empty d value also match events that
    /// carry no d tag at all.
    fn holders(
        &self,
        key: &ReplacementKey,
    ) -> impl std::future::Future<Output = Result<Vec<Event>>> + Send;
}

impl<S: Store + ?Sized> StoreExt for S {
    async fn holders(&self, key: &ReplacementKey) -> Result<Vec<Event>> {
        match key.d_tag.as_deref() {
            None => self.query_by_author_and_kind(&key.author, key.kind).await,
            Some("") => {
                let events = self.query_by_author_and_kind(&key.author, key.kind).await?;
                Ok(events.into_iter().filter(|e| key.matches(e)).collect())
            }
            Some(d) => {
                let events = self
                    .query_by_author_kind_and_tag(&key.author, key.kind, D_TAG, d)
                    .await?;
                Ok(events.into_iter().filter(|e| key.matches(e)).collect())
            }
        }
    }
}
