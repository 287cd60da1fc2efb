//! Test fixtures and helpers.
//!
//! Common setup code for integration tests. Every event a fixture produces
//! is properly signed, so it also passes [`Event::verify`].

use nostr_ingest_core::{
    Event, EventBuilder, Keypair, PublicKey, Tag, KIND_METADATA, KIND_RELAY_LIST, KIND_REPORT,
    PROTECTED_TAG,
};
use nostr_ingest_perms::Delegation;
use nostr_ingest_store::MemoryStore;

/// A fixed reference time for deterministic events (2023-11-14T22:13:20Z).
pub const BASE_TIME: u64 = 1_700_000_000;

/// A test fixture with a keypair and memory store.
pub struct TestFixture {
    pub keypair: Keypair,
    pub store: MemoryStore,
}

impl TestFixture {
    /// Create a new test fixture with a random keypair.
    pub fn new() -> Self {
        Self {
            keypair: Keypair::generate(),
            store: MemoryStore::new(),
        }
    }

    /// Create with a deterministic keypair from seed.
    ///
    /// Panics if the seed is not a valid secret key (zero, or above the
    /// curve order).
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self {
            keypair: Keypair::from_seed(&seed).expect("fixture seed must be a valid secret key"),
            store: MemoryStore::new(),
        }
    }

    /// Get the keypair's public key.
    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    /// Sign a builder with this fixture's key.
    pub fn sign(&self, builder: EventBuilder) -> Event {
        builder
            .sign(&self.keypair)
            .expect("signing a fixture event cannot fail")
    }

    /// Any event with the given kind, time and content.
    pub fn make_event(&self, kind: u32, created_at: u64, content: &str) -> Event {
        self.sign(EventBuilder::new(kind).created_at(created_at).content(content))
    }

    /// A kind 1 note at [`BASE_TIME`].
    pub fn make_text_note(&self, content: &str) -> Event {
        self.make_event(1, BASE_TIME, content)
    }

    /// A kind 0 metadata event.
    pub fn make_metadata(&self, created_at: u64, name: &str) -> Event {
        self.make_event(KIND_METADATA, created_at, &format!(r#"{{"name":"{name}"}}"#))
    }

    /// A parameterized-replaceable event addressed by `d`.
    pub fn make_addressable(&self, kind: u32, d: &str, created_at: u64, content: &str) -> Event {
        self.sign(
            EventBuilder::new(kind)
                .created_at(created_at)
                .tag(Tag::new(["d", d]))
                .content(content),
        )
    }

    /// A relay list with one `r` tag per url and empty content.
    pub fn make_relay_list(&self, urls: &[&str]) -> Event {
        self.sign(
            EventBuilder::new(KIND_RELAY_LIST)
                .created_at(BASE_TIME)
                .tags(urls.iter().map(|u| Tag::new(["r", *u]))),
        )
    }

    /// A report about `reported` with the given report type.
    pub fn make_report(&self, reported: &PublicKey, report_type: &str, content: &str) -> Event {
        self.sign(
            EventBuilder::new(KIND_REPORT)
                .created_at(BASE_TIME)
                .tag(Tag::new(["p", reported.as_str(), report_type]))
                .content(content),
        )
    }

    /// An event carrying the protected marker tag.
    pub fn make_protected(&self, kind: u32, created_at: u64) -> Event {
        self.sign(
            EventBuilder::new(kind)
                .created_at(created_at)
                .tag(Tag::new([PROTECTED_TAG])),
        )
    }

    /// An event signed by this fixture on behalf of `delegator`.
    pub fn make_delegated(
        &self,
        delegator: &Keypair,
        conditions: &str,
        kind: u32,
        created_at: u64,
    ) -> Event {
        let tag = Delegation::sign(delegator, &self.public_key(), conditions)
            .expect("fixture delegation conditions must parse");
        self.sign(EventBuilder::new(kind).created_at(created_at).tag(tag))
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create multiple test fixtures for multi-party tests.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = 1;
            seed[31] = i as u8;
            TestFixture::with_seed(seed)
        })
        .collect()
}

/// Current unix time in seconds.
pub fn now() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_secs()
}
