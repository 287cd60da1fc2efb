//! The Relay: the ingestion pipeline behind one interface.
//!
//! An inbound event flows through the acceptance policy, then the storage
//! replacer, then (only when the event was written) the notification hook.

use std::sync::Arc;

use async_trait::async_trait;

use nostr_ingest_core::{Event, PublicKey};
use nostr_ingest_perms::{AccessListSource, AccessLists, AccessSnapshot, PermsError};
use nostr_ingest_store::{AuthorList, Store};

use crate::error::{PublishError, Result};
use crate::info::{InfoConfig, RelayInformation, RelayStats, VERSION};
use crate::notify::NotificationHook;
use crate::policy::{unix_now, AcceptancePolicy, AuthContext, Decision, Limits};
use crate::publish::{PublishOutcome, StorageReplacer};

/// Result of running an event through the whole pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestResult {
    /// Turned away by the acceptance policy.
    Rejected { reason: String },
    /// Accepted and handed to storage.
    Published(PublishOutcome),
}

/// The main Relay struct.
pub struct Relay<S: Store> {
    store: Arc<S>,
    access: Arc<AccessLists>,
    policy: AcceptancePolicy,
    replacer: StorageReplacer<S>,
    notifier: NotificationHook,
    information: RelayInformation,
}

impl<S: Store + 'static> Relay<S> {
    /// Create a relay over an open store. Access lists start empty until
    /// [`reload_access_lists`](Self::reload_access_lists) runs.
    pub fn new(store: Arc<S>, limits: Limits) -> Self {
        let access = Arc::new(AccessLists::new());
        let information = RelayInformation::new(&InfoConfig::default(), &limits);
        Self {
            policy: AcceptancePolicy::new(limits, Arc::clone(&access)),
            replacer: StorageReplacer::new(Arc::clone(&store)),
            store,
            access,
            notifier: NotificationHook::disabled(),
            information,
        }
    }

    pub fn with_notifier(mut self, notifier: NotificationHook) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_information(mut self, information: RelayInformation) -> Self {
        self.information = information;
        self
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn access_lists(&self) -> &AccessLists {
        &self.access
    }

    pub fn policy(&self) -> &AcceptancePolicy {
        &self.policy
    }

    pub fn information(&self) -> &RelayInformation {
        &self.information
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Admission
    // ─────────────────────────────────────────────────────────────────────────

    pub fn accept_event(&self, event: &Event, auth: &AuthContext) -> Decision {
        self.policy.decide(event, auth)
    }

    pub fn accept_req<F: std::fmt::Debug>(&self, subscription_id: &str, filters: &[F]) -> Decision {
        self.policy.accept_req(subscription_id, filters)
    }

    /// Whether a stored event should be withheld from readers (expired).
    pub fn skip_event(&self, event: &Event) -> bool {
        event.is_expired(unix_now())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Storage
    // ─────────────────────────────────────────────────────────────────────────

    /// Store an already-accepted event and fire the notification hook if it
    /// was written.
    pub async fn publish(
        &self,
        event: &Event,
    ) -> std::result::Result<PublishOutcome, PublishError> {
        let outcome = self.replacer.publish(event).await?;
        if outcome.is_saved() {
            self.notifier.on_saved(event);
        }
        Ok(outcome)
    }

    /// Decide on `event` and publish it when accepted.
    pub async fn ingest(
        &self,
        event: &Event,
        auth: &AuthContext,
    ) -> std::result::Result<IngestResult, PublishError> {
        let decision = self.accept_event(event, auth);
        if !decision.accepted {
            return Ok(IngestResult::Rejected {
                reason: decision.reason.unwrap_or_default(),
            });
        }
        self.publish(event).await.map(IngestResult::Published)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Access Lists
    // ─────────────────────────────────────────────────────────────────────────

    /// Re-read both lists from the store. On failure the previous lists stay
    /// in effect and false is returned.
    pub async fn reload_access_lists(&self) -> bool {
        let source = StoreListSource::new(Arc::clone(&self.store));
        self.access.reload(&source).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statistics
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn stats(&self) -> Result<RelayStats> {
        let num_events = self.store.count_events().await?;
        Ok(RelayStats {
            version: VERSION.to_owned(),
            num_events,
            num_sessions: u64::from(self.store.stats().open_connections),
            supported_nips: self.information.supported_nips.clone(),
        })
    }
}

/// Reads the persisted allow/block tables through a [`Store`].
pub struct StoreListSource<S> {
    store: Arc<S>,
}

impl<S: Store> StoreListSource<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    async fn load(&self, list: AuthorList) -> std::result::Result<Vec<PublicKey>, PermsError> {
        self.store
            .load_author_list(list)
            .await
            .map_err(|e| PermsError::AccessListLoad(format!("{}: {e}", list.table())))
    }
}

#[async_trait]
impl<S: Store + 'static> AccessListSource for StoreListSource<S> {
    async fn load_snapshot(&self) -> std::result::Result<AccessSnapshot, PermsError> {
        let allow = self.load(AuthorList::Allow).await?;
        let block = self.load(AuthorList::Block).await?;
        Ok(AccessSnapshot::new(allow, block))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nostr_ingest_core::{EventBuilder, Keypair, Tag};
    use nostr_ingest_store::MemoryStore;

    fn relay() -> Relay<MemoryStore> {
        Relay::new(Arc::new(MemoryStore::new()), Limits::default())
    }

    fn keypair(seed: u8) -> Keypair {
        Keypair::from_seed(&[seed; 32]).unwrap()
    }

    fn note(author: &Keypair) -> Event {
        EventBuilder::new(1)
            .created_at(unix_now())
            .content("hello")
            .sign(author)
            .unwrap()
    }

    #[tokio::test]
    async fn test_ingest_stores_accepted_event() {
        let relay = relay();
        let event = note(&keypair(1));

        let result = relay.ingest(&event, &AuthContext::anonymous()).await.unwrap();
        assert_eq!(result, IngestResult::Published(PublishOutcome::Stored));
        assert_eq!(relay.stats().await.unwrap().num_events, 1);
    }

    #[tokio::test]
    async fn test_reload_applies_persisted_block_list() {
        let relay = relay();
        let author = keypair(1);
        relay
            .store()
            .add_author(AuthorList::Block, &author.public_key())
            .await
            .unwrap();

        // Not yet reloaded.
        assert!(relay.accept_event(&note(&author), &AuthContext::anonymous()).accepted);

        assert!(relay.reload_access_lists().await);
        let result = relay
            .ingest(&note(&author), &AuthContext::anonymous())
            .await
            .unwrap();
        assert!(
            matches!(result, IngestResult::Rejected { reason } if reason.starts_with("blocked:"))
        );
        assert_eq!(relay.store().count_events().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_skip_expired() {
        let relay = relay();
        let author = keypair(1);
        let expired = EventBuilder::new(1)
            .tag(Tag::new(["expiration", "1"]))
            .sign(&author)
            .unwrap();
        let later = (unix_now() + 3600).to_string();
        let live = EventBuilder::new(1)
            .tag(Tag::new(["expiration", later.as_str()]))
            .sign(&author)
            .unwrap();

        assert!(relay.skip_event(&expired));
        assert!(!relay.skip_event(&live));
        assert!(!relay.skip_event(&note(&author)));
    }

    #[tokio::test]
    async fn test_stats_report_supported_nips() {
        let stats = relay().stats().await.unwrap();
        assert_eq!(stats.version, VERSION);
        assert!(stats.supported_nips.contains(&11));
        assert_eq!(stats.num_sessions, 0);
    }
}
