//! Proptest generators for property-based testing.

use proptest::prelude::*;

use nostr_ingest_core::{Event, EventBuilder, EventId, Keypair, KindClass, PublicKey, Tag};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_filter_map("valid secret key", |seed| Keypair::from_seed(&seed).ok())
}

/// Generate a random EventId.
pub fn event_id() -> impl Strategy<Value = EventId> {
    any::<[u8; 32]>().prop_map(EventId::from_bytes)
}

/// Generate a random public key (not necessarily on the curve).
pub fn public_key() -> impl Strategy<Value = PublicKey> {
    any::<[u8; 32]>().prop_map(PublicKey::from_bytes)
}

/// Generate a kind from any class.
pub fn kind() -> impl Strategy<Value = u32> {
    prop_oneof![
        kind_of(KindClass::Regular),
        kind_of(KindClass::Replaceable),
        kind_of(KindClass::Ephemeral),
        kind_of(KindClass::ParameterizedReplaceable),
    ]
}

/// Generate a kind belonging to `class`.
pub fn kind_of(class: KindClass) -> BoxedStrategy<u32> {
    match class {
        KindClass::Regular => {
            prop_oneof![Just(1u32), Just(2u32), 4u32..10_000, 40_000u32..=u32::MAX].boxed()
        }
        KindClass::Replaceable => prop_oneof![Just(0u32), Just(3u32), 10_000u32..20_000].boxed(),
        KindClass::Ephemeral => (20_000u32..30_000).boxed(),
        KindClass::ParameterizedReplaceable => (30_000u32..40_000).boxed(),
    }
}

/// Generate a reasonable created_at (2020 to 2040).
pub fn created_at() -> impl Strategy<Value = u64> {
    1_577_836_800u64..=2_208_988_800u64
}

/// Generate a tag with a short name and up to three values.
pub fn tag() -> impl Strategy<Value = Tag> {
    (
        "[a-z]{1,2}",
        prop::collection::vec("[ -~]{0,24}", 0..=3),
    )
        .prop_map(|(name, values)| Tag::new(std::iter::once(name).chain(values)))
}

/// Parameters for generating an event.
#[derive(Debug, Clone)]
pub struct EventParams {
    pub keypair: Keypair,
    pub kind: u32,
    pub created_at: u64,
    pub tags: Vec<Tag>,
    pub content: String,
}

impl Arbitrary for EventParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            keypair(),
            kind(),
            created_at(),
            prop::collection::vec(tag(), 0..6),
            "\\PC{0,200}",
        )
            .prop_map(|(keypair, kind, created_at, tags, content)| EventParams {
                keypair,
                kind,
                created_at,
                tags,
                content,
            })
            .boxed()
    }
}

/// Generate an event from parameters.
pub fn event_from_params(params: &EventParams) -> Event {
    EventBuilder::new(params.kind)
        .created_at(params.created_at)
        .tags(params.tags.clone())
        .content(params.content.clone())
        .sign(&params.keypair)
        .expect("signing generated params cannot fail")
}
