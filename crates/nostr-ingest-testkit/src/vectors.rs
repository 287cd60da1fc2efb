//! Known-answer vectors for the two authorization validators.
//!
//! Each vector describes an event shape and whether it must validate.
//! Keys come from fixed seeds so the produced events are identical on every
//! run.

use nostr_ingest_core::{Event, EventBuilder, Keypair, Tag, KIND_RELAY_LIST};
use nostr_ingest_perms::Delegation;

/// Seed of the delegating identity.
pub const DELEGATOR_SEED: [u8; 32] = [0x42; 32];
/// Seed of the identity that signs delegated events.
pub const DELEGATEE_SEED: [u8; 32] = [0x24; 32];

/// A delegation known-answer case.
#[derive(Debug, Clone)]
pub struct DelegationVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub conditions: &'static str,
    pub kind: u32,
    pub created_at: u64,
    pub expected_valid: bool,
}

/// All delegation vectors.
pub fn delegation_vectors() -> Vec<DelegationVector> {
    vec![
        DelegationVector {
            name: "kind and window satisfied",
            conditions: "kind=1&created_at>1674834236&created_at<1677426236",
            kind: 1,
            created_at: 1_675_000_000,
            expected_valid: true,
        },
        DelegationVector {
            name: "kind not granted",
            conditions: "kind=1&created_at>1674834236&created_at<1677426236",
            kind: 7,
            created_at: 1_675_000_000,
            expected_valid: false,
        },
        DelegationVector {
            name: "after the window",
            conditions: "kind=1&created_at<1677426236",
            kind: 1,
            created_at: 1_677_426_236,
            expected_valid: false,
        },
        DelegationVector {
            name: "before the window",
            conditions: "kind=1&created_at>1674834236",
            kind: 1,
            created_at: 1_674_834_236,
            expected_valid: false,
        },
        DelegationVector {
            name: "second kind clause matches",
            conditions: "kind=0&kind=30023",
            kind: 30_023,
            created_at: 1_675_000_000,
            expected_valid: true,
        },
        DelegationVector {
            name: "no kind clause",
            conditions: "created_at>0",
            kind: 1,
            created_at: 1_675_000_000,
            expected_valid: false,
        },
    ]
}

/// Sign the event a delegation vector describes.
pub fn event_from_delegation_vector(vector: &DelegationVector) -> Event {
    let delegator = Keypair::from_seed(&DELEGATOR_SEED).expect("valid vector seed");
    let delegatee = Keypair::from_seed(&DELEGATEE_SEED).expect("valid vector seed");
    let tag = Delegation::sign(&delegator, &delegatee.public_key(), vector.conditions)
        .expect("vector conditions parse");

    EventBuilder::new(vector.kind)
        .created_at(vector.created_at)
        .tag(tag)
        .sign(&delegatee)
        .expect("signing vector event cannot fail")
}

/// A relay list known-answer case.
#[derive(Debug, Clone)]
pub struct RelayListVector {
    pub name: &'static str,
    pub content: &'static str,
    /// Each entry becomes one tag; `None` produces a bare `["r"]` tag.
    pub urls: &'static [Option<&'static str>],
    pub expected_valid: bool,
}

/// All relay list vectors.
pub fn relay_list_vectors() -> Vec<RelayListVector> {
    vec![
        RelayListVector {
            name: "secure and plain websocket urls",
            content: "",
            urls: &[Some("wss://relay.example"), Some("ws://localhost:7447")],
            expected_valid: true,
        },
        RelayListVector {
            name: "no relays at all",
            content: "",
            urls: &[],
            expected_valid: true,
        },
        RelayListVector {
            name: "non-empty content",
            content: "my relays",
            urls: &[Some("wss://relay.example")],
            expected_valid: false,
        },
        RelayListVector {
            name: "https url",
            content: "",
            urls: &[Some("wss://relay.example"), Some("https://relay.example")],
            expected_valid: false,
        },
        RelayListVector {
            name: "empty url",
            content: "",
            urls: &[Some("")],
            expected_valid: false,
        },
        RelayListVector {
            name: "bare r tag",
            content: "",
            urls: &[None],
            expected_valid: false,
        },
    ]
}

/// Sign the kind 10002 event a relay list vector describes.
pub fn event_from_relay_list_vector(vector: &RelayListVector) -> Event {
    let keypair = Keypair::from_seed(&DELEGATEE_SEED).expect("valid vector seed");
    let tags = vector.urls.iter().map(|url| match url {
        Some(url) => Tag::new(["r", *url]),
        None => Tag::new(["r"]),
    });

    EventBuilder::new(KIND_RELAY_LIST)
        .created_at(1_700_000_000)
        .tags(tags)
        .content(vector.content)
        .sign(&keypair)
        .expect("signing vector event cannot fail")
}
