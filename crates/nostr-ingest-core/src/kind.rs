//! Kind classes and replacement keys.
//!
//! The storage policy for an event is a pure function of its kind:
//!
//! | Class | Kinds |
//! |---|---|
//! | Replaceable | 0, 3, 10000..20000 |
//! | Ephemeral | 20000..30000 |
//! | ParameterizedReplaceable | 30000..40000 |
//! | Regular | everything else |

use crate::event::Event;
use crate::types::PublicKey;

pub const KIND_METADATA: u32 = 0;
pub const KIND_CONTACTS: u32 = 3;
pub const KIND_REPORT: u32 = 1984;
pub const KIND_RELAY_LIST: u32 = 10002;

/// Name of the tag that parameterizes replaceable slots.
pub const D_TAG: &str = "d";

/// Storage class of a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindClass {
    /// Stored; duplicates by id are detected.
    Regular,
    /// One event per (author, kind).
    Replaceable,
    /// Relayed, never stored.
    Ephemeral,
    /// One event per (author, kind, d-tag).
    ParameterizedReplaceable,
}

impl KindClass {
    pub const fn of(kind: u32) -> Self {
        match kind {
            KIND_METADATA | KIND_CONTACTS | 10_000..=19_999 => KindClass::Replaceable,
            20_000..=29_999 => KindClass::Ephemeral,
            30_000..=39_999 => KindClass::ParameterizedReplaceable,
            _ => KindClass::Regular,
        }
    }

    pub const fn is_replaceable(self) -> bool {
        matches!(
            self,
            KindClass::Replaceable | KindClass::ParameterizedReplaceable
        )
    }
}

/// The slot a replaceable event occupies. At most one stored event per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReplacementKey {
    pub author: PublicKey,
    pub kind: u32,
    /// `Some` for parameterized kinds; a missing d tag reads as `""`.
    pub d_tag: Option<String>,
}

impl ReplacementKey {
    /// Derive the key for an event, or `None` when its kind is not replaceable.
    pub fn for_event(event: &Event) -> Option<Self> {
        match KindClass::of(event.kind) {
            KindClass::Replaceable => Some(Self {
                author: event.pubkey.clone(),
                kind: event.kind,
                d_tag: None,
            }),
            KindClass::ParameterizedReplaceable => Some(Self {
                author: event.pubkey.clone(),
                kind: event.kind,
                d_tag: Some(d_tag_value(event).to_owned()),
            }),
            KindClass::Regular | KindClass::Ephemeral => None,
        }
    }

    /// True when `event` occupies this slot.
    pub fn matches(&self, event: &Event) -> bool {
        Self::for_event(event).as_ref() == Some(self)
    }
}

/// The d-tag value used for parameterized keys.
pub fn d_tag_value(event: &Event) -> &str {
    event.first_tag_value(D_TAG).unwrap_or("")
}

/// Whether `candidate` should take the slot currently held by `stored`.
///
/// Newer `created_at` wins. On a tie the event with the lexicographically
/// lowest id is retained, so racing writers agree on one survivor whatever
/// order they commit in. An event never supersedes itself.
pub fn supersedes(candidate: &Event, stored: &Event) -> bool {
    match candidate.created_at.cmp(&stored.created_at) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => candidate.id < stored.id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Tag;
    use crate::types::EventId;

    fn event(kind: u32, created_at: u64, id: &str, tags: Vec<Tag>) -> Event {
        Event {
            id: EventId::new(id),
            pubkey: PublicKey::new("aa".repeat(32)),
            created_at,
            kind,
            tags,
            content: String::new(),
            sig: String::new(),
        }
    }

    #[test]
    fn test_kind_class_boundaries() {
        assert_eq!(KindClass::of(0), KindClass::Replaceable);
        assert_eq!(KindClass::of(1), KindClass::Regular);
        assert_eq!(KindClass::of(3), KindClass::Replaceable);
        assert_eq!(KindClass::of(9_999), KindClass::Regular);
        assert_eq!(KindClass::of(10_000), KindClass::Replaceable);
        assert_eq!(KindClass::of(19_999), KindClass::Replaceable);
        assert_eq!(KindClass::of(20_000), KindClass::Ephemeral);
        assert_eq!(KindClass::of(29_999), KindClass::Ephemeral);
        assert_eq!(KindClass::of(30_000), KindClass::ParameterizedReplaceable);
        assert_eq!(KindClass::of(39_999), KindClass::ParameterizedReplaceable);
        assert_eq!(KindClass::of(40_000), KindClass::Regular);
        assert_eq!(KindClass::of(KIND_REPORT), KindClass::Regular);
    }

    #[test]
    fn test_key_for_regular_and_ephemeral_is_none() {
        assert!(ReplacementKey::for_event(&event(1, 0, "a", vec![])).is_none());
        assert!(ReplacementKey::for_event(&event(20_001, 0, "a", vec![])).is_none());
    }

    #[test]
    fn test_parameterized_key_defaults_to_empty_d() {
        let without = event(30_023, 0, "a", vec![]);
        let empty = event(30_023, 0, "b", vec![Tag::new(["d", ""])]);
        let bare = event(30_023, 0, "c", vec![Tag::new(["d"])]);

        let key = ReplacementKey::for_event(&without).unwrap();
        assert_eq!(key.d_tag.as_deref(), Some(""));
        assert!(key.matches(&empty));
        assert!(key.matches(&bare));
    }

    #[test]
    fn test_distinct_d_tags_are_distinct_slots() {
        let a = event(30_023, 0, "a", vec![Tag::new(["d", "x"])]);
        let b = event(30_023, 0, "b", vec![Tag::new(["d", "y"])]);
        assert_ne!(
            ReplacementKey::for_event(&a),
            ReplacementKey::for_event(&b)
        );
    }

    #[test]
    fn test_supersedes_by_timestamp() {
        let old = event(0, 100, "ff", vec![]);
        let new = event(0, 200, "00", vec![]);
        assert!(supersedes(&new, &old));
        assert!(!supersedes(&old, &new));
    }

    #[test]
    fn test_supersedes_tie_keeps_lowest_id() {
        let low = event(0, 100, "0a", vec![]);
        let high = event(0, 100, "0b", vec![]);
        assert!(supersedes(&low, &high));
        assert!(!supersedes(&high, &low));
        assert!(!supersedes(&low, &low));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn distinct_events_have_exactly_one_winner(
                t1 in 0u64..1000,
                t2 in 0u64..1000,
                id1 in "[0-9a-f]{64}",
                id2 in "[0-9a-f]{64}",
            ) {
                prop_assume!(id1 != id2);
                let a = event(0, t1, &id1, vec![]);
                let b = event(0, t2, &id2, vec![]);
                prop_assert!(supersedes(&a, &b) != supersedes(&b, &a));
            }

            #[test]
            fn class_is_total(kind in any::<u32>()) {
                let class = KindClass::of(kind);
                let key = ReplacementKey::for_event(&event(kind, 0, "a", vec![]));
                prop_assert_eq!(class.is_replaceable(), key.is_some());
            }
        }
    }
}
