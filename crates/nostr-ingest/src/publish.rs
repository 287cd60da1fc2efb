//! Kind-driven storage of accepted events.
//!
//! | Class | Storage |
//! |---|---|
//! | Ephemeral | never stored |
//! | Regular | plain insert; a known id is a duplicate |
//! | Replaceable / ParameterizedReplaceable | atomic replace-if-newer on the slot |

use std::sync::Arc;

use nostr_ingest_core::{Event, EventId, KindClass};
use nostr_ingest_store::{InsertResult, ReplaceResult, Store};

use crate::error::PublishError;

/// What publishing an event did to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Inserted; nothing was displaced.
    Stored,
    /// Inserted, displacing the previous slot holders.
    Replaced { previous: Vec<EventId> },
    /// Ephemeral kind; no storage I/O happened.
    Ephemeral,
    /// A holder at least as new keeps the slot. Success for the publisher.
    Ignored { current: EventId },
    /// This exact event is already stored.
    Duplicate,
}

impl PublishOutcome {
    /// True when the event was written.
    pub fn is_saved(&self) -> bool {
        matches!(self, PublishOutcome::Stored | PublishOutcome::Replaced { .. })
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, PublishOutcome::Duplicate)
    }
}

/// Applies the per-class storage policy against a [`Store`].
pub struct StorageReplacer<S> {
    store: Arc<S>,
}

impl<S: Store> StorageReplacer<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Commit an accepted event.
    pub async fn publish(&self, event: &Event) -> Result<PublishOutcome, PublishError> {
        if event.kind_class() == KindClass::Ephemeral {
            return Ok(PublishOutcome::Ephemeral);
        }

        let outcome = match event.replacement_key() {
            Some(key) => match self.store.replace_event(event, &key).await? {
                ReplaceResult::Inserted { replaced } if replaced.is_empty() => {
                    PublishOutcome::Stored
                }
                ReplaceResult::Inserted { replaced } => {
                    tracing::debug!(id = %event.id, ?replaced, "replaced older events");
                    PublishOutcome::Replaced { previous: replaced }
                }
                ReplaceResult::Stale { current } => {
                    tracing::debug!(id = %event.id, %current, "newer event holds the slot");
                    PublishOutcome::Ignored { current }
                }
                ReplaceResult::AlreadyExists => PublishOutcome::Duplicate,
            },
            None => match self.store.insert_event(event).await? {
                InsertResult::Inserted => PublishOutcome::Stored,
                InsertResult::AlreadyExists => PublishOutcome::Duplicate,
            },
        };

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nostr_ingest_core::{EventBuilder, Keypair, Tag};
    use nostr_ingest_store::MemoryStore;

    fn replacer() -> StorageReplacer<MemoryStore> {
        StorageReplacer::new(Arc::new(MemoryStore::new()))
    }

    fn keypair() -> Keypair {
        Keypair::from_seed(&[9; 32]).unwrap()
    }

    fn event(kind: u32, created_at: u64, content: &str) -> Event {
        EventBuilder::new(kind)
            .created_at(created_at)
            .content(content)
            .sign(&keypair())
            .unwrap()
    }

    #[tokio::test]
    async fn test_regular_then_duplicate() {
        let r = replacer();
        let e = event(1, 10, "a");

        assert_eq!(r.publish(&e).await.unwrap(), PublishOutcome::Stored);
        assert_eq!(r.publish(&e).await.unwrap(), PublishOutcome::Duplicate);
        assert_eq!(r.store().count_events().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ephemeral_never_stored() {
        let r = replacer();
        let e = event(20_001, 10, "typing");

        assert_eq!(r.publish(&e).await.unwrap(), PublishOutcome::Ephemeral);
        assert_eq!(r.store().count_events().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_replaceable_newer_wins_either_order() {
        let old = event(0, 10, "old");
        let new = event(0, 20, "new");

        let r = replacer();
        assert_eq!(r.publish(&old).await.unwrap(), PublishOutcome::Stored);
        assert_eq!(
            r.publish(&new).await.unwrap(),
            PublishOutcome::Replaced {
                previous: vec![old.id.clone()]
            }
        );

        let r = replacer();
        r.publish(&new).await.unwrap();
        assert_eq!(
            r.publish(&old).await.unwrap(),
            PublishOutcome::Ignored {
                current: new.id.clone()
            }
        );

        assert_eq!(r.store().get_event(&new.id).await.unwrap(), Some(new));
        assert_eq!(r.store().count_events().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_replaceable_republish_is_duplicate() {
        let r = replacer();
        let e = event(10_002, 10, "");

        r.publish(&e).await.unwrap();
        let outcome = r.publish(&e).await.unwrap();
        assert!(outcome.is_duplicate());
        assert!(!outcome.is_saved());
    }

    #[tokio::test]
    async fn test_parameterized_slots_are_independent() {
        let r = replacer();
        let kp = keypair();
        let addressed = |d: &str, at: u64| {
            EventBuilder::new(30_023)
                .created_at(at)
                .tag(Tag::new(["d", d]))
                .sign(&kp)
                .unwrap()
        };

        r.publish(&addressed("a", 10)).await.unwrap();
        r.publish(&addressed("b", 10)).await.unwrap();
        let outcome = r.publish(&addressed("a", 20)).await.unwrap();

        assert!(matches!(outcome, PublishOutcome::Replaced { .. }));
        assert_eq!(r.store().count_events().await.unwrap(), 2);
    }
}
