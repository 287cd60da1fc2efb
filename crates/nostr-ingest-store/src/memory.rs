//! In-memory implementation of the Store trait.
//!
//! Same semantics as SQLite but nothing is persisted. Suitable for tests
//! and for relays that only need to hold events for their own lifetime.

use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use nostr_ingest_core::{supersedes, Event, EventId, PublicKey, ReplacementKey};

use crate::error::{Result, StoreError};
use crate::traits::{AuthorList, InsertResult, ReplaceResult, Store, StoreStats};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock; the
/// replace step holds the write lock for its whole duration.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Events indexed by id.
    events: HashMap<EventId, Event>,

    /// Author lists.
    allow: BTreeSet<PublicKey>,
    block: BTreeSet<PublicKey>,
}

impl MemoryStoreInner {
    fn list_mut(&mut self, list: AuthorList) -> &mut BTreeSet<PublicKey> {
        match list {
            AuthorList::Allow => &mut self.allow,
            AuthorList::Block => &mut self.block,
        }
    }

    fn newest_first(&self, mut pred: impl FnMut(&Event) -> bool) -> Vec<Event> {
        let mut events: Vec<Event> = self.events.values().filter(|e| pred(*e)).cloned().collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        events
    }
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_event(&self, event: &Event) -> Result<InsertResult> {
        let mut inner = self.write()?;

        if inner.events.contains_key(&event.id) {
            return Ok(InsertResult::AlreadyExists);
        }
        inner.events.insert(event.id.clone(), event.clone());
        Ok(InsertResult::Inserted)
    }

    async fn replace_event(&self, event: &Event, key: &ReplacementKey) -> Result<ReplaceResult> {
        let mut inner = self.write()?;

        if inner.events.contains_key(&event.id) {
            return Ok(ReplaceResult::AlreadyExists);
        }

        let holders: Vec<&Event> = inner.events.values().filter(|e| key.matches(e)).collect();
        if let Some(keeper) = holders.iter().find(|h| !supersedes(event, h)) {
            return Ok(ReplaceResult::Stale {
                current: keeper.id.clone(),
            });
        }

        let replaced: Vec<EventId> = holders.iter().map(|h| h.id.clone()).collect();
        for id in &replaced {
            inner.events.remove(id);
        }
        inner.events.insert(event.id.clone(), event.clone());

        tracing::debug!(
            event_id = %event.id,
            kind = event.kind,
            replaced = replaced.len(),
            "replaced slot holder"
        );
        Ok(ReplaceResult::Inserted { replaced })
    }

    async fn delete_event(&self, id: &EventId) -> Result<bool> {
        Ok(self.write()?.events.remove(id).is_some())
    }

    async fn get_event(&self, id: &EventId) -> Result<Option<Event>> {
        Ok(self.read()?.events.get(id).cloned())
    }

    async fn count_events(&self) -> Result<u64> {
        Ok(self.read()?.events.len() as u64)
    }

    async fn query_by_author_and_kind(&self, author: &PublicKey, kind: u32) -> Result<Vec<Event>> {
        let inner = self.read()?;
        Ok(inner.newest_first(|e| &e.pubkey == author && e.kind == kind))
    }

    async fn query_by_author_kind_and_tag(
        &self,
        author: &PublicKey,
        kind: u32,
        tag_name: &str,
        tag_value: &str,
    ) -> Result<Vec<Event>> {
        let inner = self.read()?;
        Ok(inner.newest_first(|e| {
            &e.pubkey == author
                && e.kind == kind
                && e.tags_named(tag_name).any(|t| t.value() == Some(tag_value))
        }))
    }

    async fn load_author_list(&self, list: AuthorList) -> Result<Vec<PublicKey>> {
        let inner = self.read()?;
        let set = match list {
            AuthorList::Allow => &inner.allow,
            AuthorList::Block => &inner.block,
        };
        Ok(set.iter().cloned().collect())
    }

    async fn add_author(&self, list: AuthorList, author: &PublicKey) -> Result<()> {
        self.write()?.list_mut(list).insert(author.clone());
        Ok(())
    }

    async fn remove_author(&self, list: AuthorList, author: &PublicKey) -> Result<bool> {
        Ok(self.write()?.list_mut(list).remove(author))
    }

    fn stats(&self) -> StoreStats {
        StoreStats::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::StoreExt;
    use nostr_ingest_core::{EventBuilder, Keypair, Tag};

    fn make_event(seed: u8, kind: u32, created_at: u64, d: Option<&str>) -> Event {
        let kp = Keypair::from_seed(&[seed; 32]).unwrap();
        let mut builder = EventBuilder::new(kind).created_at(created_at);
        if let Some(d) = d {
            builder = builder.tag(Tag::new(["d", d]));
        }
        builder.sign(&kp).unwrap()
    }

    #[tokio::test]
    async fn test_insert_idempotent() {
        let store = MemoryStore::new();
        let event = make_event(1, 1, 10, None);

        assert_eq!(store.insert_event(&event).await.unwrap(), InsertResult::Inserted);
        assert_eq!(
            store.insert_event(&event).await.unwrap(),
            InsertResult::AlreadyExists
        );
        assert_eq!(store.count_events().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_replace_older_is_stale() {
        let store = MemoryStore::new();
        let newer = make_event(2, 3, 200, None);
        let older = make_event(2, 3, 100, None);
        let key = newer.replacement_key().unwrap();

        store.replace_event(&newer, &key).await.unwrap();
        assert_eq!(
            store.replace_event(&older, &key).await.unwrap(),
            ReplaceResult::Stale {
                current: newer.id.clone()
            }
        );
        assert_eq!(store.holders(&key).await.unwrap(), vec![newer]);
    }

    #[tokio::test]
    async fn test_holders_for_empty_d_include_untagged() {
        let store = MemoryStore::new();
        let untagged = make_event(3, 30_001, 5, None);
        store.insert_event(&untagged).await.unwrap();

        let key = untagged.replacement_key().unwrap();
        assert_eq!(key.d_tag.as_deref(), Some(""));
        assert_eq!(store.holders(&key).await.unwrap(), vec![untagged]);
    }

    #[tokio::test]
    async fn test_tag_query_matches_any_tag_with_name() {
        let store = MemoryStore::new();
        let event = make_event(4, 30_001, 5, Some("slot"));
        store.insert_event(&event).await.unwrap();

        let found = store
            .query_by_author_kind_and_tag(&event.pubkey, 30_001, "d", "slot")
            .await
            .unwrap();
        assert_eq!(found.len(), 1);

        let missing = store
            .query_by_author_kind_and_tag(&event.pubkey, 30_001, "d", "other")
            .await
            .unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn test_author_lists_are_sets() {
        let store = MemoryStore::new();
        let pk = PublicKey::new("ab".repeat(32));

        store.add_author(AuthorList::Allow, &pk).await.unwrap();
        store.add_author(AuthorList::Allow, &pk).await.unwrap();
        assert_eq!(store.load_author_list(AuthorList::Allow).await.unwrap().len(), 1);
        assert!(store.load_author_list(AuthorList::Block).await.unwrap().is_empty());
        assert!(!store.remove_author(AuthorList::Block, &pk).await.unwrap());
    }
}
