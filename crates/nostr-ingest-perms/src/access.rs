//! Allow and block lists.
//!
//! The lists are held as one immutable [`AccessSnapshot`] behind an `Arc`.
//! Reload builds a complete new snapshot away from the lock and then swaps
//! the pointer, so readers see either the old lists or the new ones, never
//! a mixture. A failed load leaves the current snapshot in place.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use nostr_ingest_core::PublicKey;

use crate::error::Result;

/// An immutable view of both lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessSnapshot {
    allow: HashSet<PublicKey>,
    block: HashSet<PublicKey>,
}

impl AccessSnapshot {
    pub fn new(
        allow: impl IntoIterator<Item = PublicKey>,
        block: impl IntoIterator<Item = PublicKey>,
    ) -> Self {
        Self {
            allow: allow.into_iter().collect(),
            block: block.into_iter().collect(),
        }
    }

    pub fn is_blocked(&self, author: &PublicKey) -> bool {
        self.block.contains(author)
    }

    /// True when the allow list is non-empty and therefore restricts publishing.
    pub fn is_allow_list_restricted(&self) -> bool {
        !self.allow.is_empty()
    }

    /// Membership in the allow list. Callers check restriction first.
    pub fn is_allowed(&self, author: &PublicKey) -> bool {
        self.allow.contains(author)
    }

    pub fn allow_len(&self) -> usize {
        self.allow.len()
    }

    pub fn block_len(&self) -> usize {
        self.block.len()
    }
}

/// Where snapshots are loaded from.
#[async_trait]
pub trait AccessListSource: Send + Sync {
    /// Read both lists in full.
    async fn load_snapshot(&self) -> Result<AccessSnapshot>;
}

/// The reloadable allow/block list store.
#[derive(Debug, Default)]
pub struct AccessLists {
    current: RwLock<Arc<AccessSnapshot>>,
}

impl AccessLists {
    /// Start with empty lists: nobody blocked, nobody restricted.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: AccessSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// The snapshot in effect right now.
    pub fn snapshot(&self) -> Arc<AccessSnapshot> {
        // The guarded value is a plain pointer; a poisoned lock still holds a
        // complete snapshot.
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in a new snapshot.
    pub fn replace(&self, snapshot: AccessSnapshot) {
        let next = Arc::new(snapshot);
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Reload from `source`. Returns false, keeping the current lists, when
    /// the source fails.
    pub async fn reload(&self, source: &dyn AccessListSource) -> bool {
        match source.load_snapshot().await {
            Ok(snapshot) => {
                tracing::info!(
                    allow = snapshot.allow_len(),
                    block = snapshot.block_len(),
                    "reloaded access lists"
                );
                self.replace(snapshot);
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "access list reload failed, keeping previous lists");
                false
            }
        }
    }

    pub fn is_blocked(&self, author: &PublicKey) -> bool {
        self.snapshot().is_blocked(author)
    }

    pub fn is_allow_list_restricted(&self) -> bool {
        self.snapshot().is_allow_list_restricted()
    }

    pub fn is_allowed(&self, author: &PublicKey) -> bool {
        self.snapshot().is_allowed(author)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PermsError;

    fn pk(c: char) -> PublicKey {
        PublicKey::new(c.to_string().repeat(64))
    }

    struct Fixed(AccessSnapshot);

    #[async_trait]
    impl AccessListSource for Fixed {
        async fn load_snapshot(&self) -> Result<AccessSnapshot> {
            Ok(self.0.clone())
        }
    }

    struct Broken;

    #[async_trait]
    impl AccessListSource for Broken {
        async fn load_snapshot(&self) -> Result<AccessSnapshot> {
            Err(PermsError::AccessListLoad("table missing".into()))
        }
    }

    #[test]
    fn test_empty_lists_restrict_nothing() {
        let lists = AccessLists::new();
        assert!(!lists.is_blocked(&pk('a')));
        assert!(!lists.is_allow_list_restricted());
    }

    #[test]
    fn test_membership() {
        let lists = AccessLists::with_snapshot(AccessSnapshot::new([pk('a')], [pk('b')]));
        assert!(lists.is_allow_list_restricted());
        assert!(lists.is_allowed(&pk('a')));
        assert!(!lists.is_allowed(&pk('b')));
        assert!(lists.is_blocked(&pk('b')));
    }

    #[tokio::test]
    async fn test_reload_swaps_whole_snapshot() {
        let lists = AccessLists::with_snapshot(AccessSnapshot::new([pk('a')], [pk('b')]));
        let before = lists.snapshot();

        let ok = lists
            .reload(&Fixed(AccessSnapshot::new([], [pk('c')])))
            .await;
        assert!(ok);

        assert!(!lists.is_allow_list_restricted());
        assert!(lists.is_blocked(&pk('c')));
        assert!(!lists.is_blocked(&pk('b')));

        // A reader holding the old snapshot still sees the old lists.
        assert!(before.is_blocked(&pk('b')));
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous() {
        let lists = AccessLists::with_snapshot(AccessSnapshot::new([], [pk('b')]));

        assert!(!lists.reload(&Broken).await);
        assert!(lists.is_blocked(&pk('b')));
    }
}
