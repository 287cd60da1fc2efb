//! Admission control for inbound events and subscription requests.
//!
//! [`AcceptancePolicy::decide`] runs a fixed sequence of checks and stops at
//! the first failure:
//!
//! 1. `created_at` no further ahead than `max_future_seconds`
//! 2. protected events only from their authenticated author
//! 3. delegation tag, when present, valid
//! 4. kind-specific structure (relay list metadata)
//! 5. author, or the delegator of a valid delegation, not blocked
//! 6. author on the allow list, when the allow list is non-empty
//! 7. content no longer than `max_content_length` bytes
//!
//! Decisions never touch storage or the network.

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use nostr_ingest_core::{validate_kind_structure, Event, PublicKey};
use nostr_ingest_perms::{validate_delegation, AccessLists};

/// Numeric limits enforced by the relay and advertised in its information
/// document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum content size in bytes.
    pub max_content_length: usize,
    /// Maximum number of filters in one subscription request.
    pub max_filters: usize,
    /// How far `created_at` may lie in the future, in seconds.
    pub max_future_seconds: u64,
    pub max_message_length: usize,
    pub max_subscriptions: usize,
    pub max_limit: usize,
    pub max_subid_length: usize,
    pub max_event_tags: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_content_length: 16_384,
            max_filters: 200,
            max_future_seconds: 30 * 60,
            max_message_length: 524_288,
            max_subscriptions: 20,
            max_limit: 500,
            max_subid_length: 100,
            max_event_tags: 100,
        }
    }
}

/// Authentication state of the connection an event arrived on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    pub pubkey: Option<PublicKey>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(pubkey: PublicKey) -> Self {
        Self {
            pubkey: Some(pubkey),
        }
    }
}

/// Why an event or request was turned away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    FutureTimestamp { created_at: u64, limit: u64 },
    AuthRequired,
    MalformedDelegation,
    MalformedRelayList,
    Blocked,
    BlockedDelegator,
    NotAllowed,
    ContentTooLong { len: usize, max: usize },
    TooManyFilters { count: usize, max: usize },
}

impl Rejection {
    /// The machine-readable prefix of the reason string.
    pub const fn prefix(&self) -> &'static str {
        match self {
            Rejection::AuthRequired => "auth-required",
            Rejection::Blocked | Rejection::BlockedDelegator | Rejection::NotAllowed => "blocked",
            Rejection::TooManyFilters { .. } => "rate-limited",
            Rejection::FutureTimestamp { .. }
            | Rejection::MalformedDelegation
            | Rejection::MalformedRelayList
            | Rejection::ContentTooLong { .. } => "invalid",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.prefix())?;
        match self {
            Rejection::FutureTimestamp { created_at, limit } => {
                write!(f, "created_at {created_at} is later than {limit}")
            }
            Rejection::AuthRequired => f.write_str("need to authenticate"),
            Rejection::MalformedDelegation => f.write_str("malformed delegation"),
            Rejection::MalformedRelayList => f.write_str("malformed relay list metadata"),
            Rejection::Blocked => f.write_str("pubkey is blocked"),
            Rejection::BlockedDelegator => f.write_str("delegator is blocked"),
            Rejection::NotAllowed => f.write_str("pubkey is not allowed"),
            Rejection::ContentTooLong { len, max } => {
                write!(f, "content is {len} bytes, limit is {max}")
            }
            Rejection::TooManyFilters { count, max } => {
                write!(f, "filters are limited to {max} (got {count})")
            }
        }
    }
}

/// The outcome of an admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub accepted: bool,
    /// Present exactly when `accepted` is false.
    pub reason: Option<String>,
}

impl Decision {
    pub fn accept() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    pub fn reject(rejection: &Rejection) -> Self {
        Self {
            accepted: false,
            reason: Some(rejection.to_string()),
        }
    }
}

impl From<Result<(), Rejection>> for Decision {
    fn from(result: Result<(), Rejection>) -> Self {
        match result {
            Ok(()) => Decision::accept(),
            Err(rejection) => Decision::reject(&rejection),
        }
    }
}

/// Decides whether inbound events and requests may proceed.
#[derive(Debug, Clone)]
pub struct AcceptancePolicy {
    limits: Limits,
    access: Arc<AccessLists>,
}

impl AcceptancePolicy {
    pub fn new(limits: Limits, access: Arc<AccessLists>) -> Self {
        Self { limits, access }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Decide on `event` against the current clock.
    pub fn decide(&self, event: &Event, auth: &AuthContext) -> Decision {
        self.decide_at(event, auth, unix_now())
    }

    /// Decide on `event` as if the time were `now`.
    pub fn decide_at(&self, event: &Event, auth: &AuthContext, now: u64) -> Decision {
        let result = self.evaluate(event, auth, now);
        match &result {
            Ok(()) => tracing::debug!(?event, "accept event"),
            Err(rejection) => tracing::debug!(?event, reason = %rejection, "reject event"),
        }
        result.into()
    }

    /// The typed form of [`decide_at`](Self::decide_at).
    pub fn evaluate(&self, event: &Event, auth: &AuthContext, now: u64) -> Result<(), Rejection> {
        let limit = now.saturating_add(self.limits.max_future_seconds);
        if event.created_at > limit {
            return Err(Rejection::FutureTimestamp {
                created_at: event.created_at,
                limit,
            });
        }

        if event.is_protected() && auth.pubkey.as_ref() != Some(&event.pubkey) {
            return Err(Rejection::AuthRequired);
        }

        let delegator = validate_delegation(event).map_err(|e| {
            tracing::debug!(error = %e, id = %event.id, "delegation rejected");
            Rejection::MalformedDelegation
        })?;

        if let Err(e) = validate_kind_structure(event) {
            tracing::debug!(error = %e, id = %event.id, "relay list rejected");
            return Err(Rejection::MalformedRelayList);
        }

        // One snapshot for both list checks.
        let lists = self.access.snapshot();
        if lists.is_blocked(&event.pubkey) {
            return Err(Rejection::Blocked);
        }
        if delegator.as_ref().is_some_and(|d| lists.is_blocked(d)) {
            return Err(Rejection::BlockedDelegator);
        }
        if lists.is_allow_list_restricted() && !lists.is_allowed(&event.pubkey) {
            return Err(Rejection::NotAllowed);
        }

        let len = event.content.len();
        if len > self.limits.max_content_length {
            return Err(Rejection::ContentTooLong {
                len,
                max: self.limits.max_content_length,
            });
        }

        Ok(())
    }

    /// Decide on a subscription request. Filters are opaque here; only their
    /// number matters.
    pub fn accept_req<F: fmt::Debug>(&self, subscription_id: &str, filters: &[F]) -> Decision {
        let max = self.limits.max_filters;
        if filters.len() > max {
            let rejection = Rejection::TooManyFilters {
                count: filters.len(),
                max,
            };
            tracing::debug!(subscription_id, reason = %rejection, "reject req");
            return Decision::reject(&rejection);
        }
        tracing::debug!(subscription_id, ?filters, "accept req");
        Decision::accept()
    }
}

/// Seconds since the unix epoch. A clock before 1970 reads as zero.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nostr_ingest_core::{EventBuilder, Keypair, Tag};
    use nostr_ingest_perms::{AccessSnapshot, Delegation};

    const NOW: u64 = 1_700_000_000;

    fn keypair(seed: u8) -> Keypair {
        Keypair::from_seed(&[seed; 32]).unwrap()
    }

    fn policy_with(snapshot: AccessSnapshot) -> AcceptancePolicy {
        AcceptancePolicy::new(
            Limits::default(),
            Arc::new(AccessLists::with_snapshot(snapshot)),
        )
    }

    fn policy() -> AcceptancePolicy {
        policy_with(AccessSnapshot::default())
    }

    fn note(author: &Keypair, created_at: u64) -> Event {
        EventBuilder::new(1)
            .created_at(created_at)
            .content("hi")
            .sign(author)
            .unwrap()
    }

    fn anon() -> AuthContext {
        AuthContext::anonymous()
    }

    #[test]
    fn test_plain_event_accepted() {
        let decision = policy().decide_at(&note(&keypair(1), NOW), &anon(), NOW);
        assert_eq!(decision, Decision::accept());
    }

    #[test]
    fn test_future_skew() {
        let p = policy();
        let at_limit = note(&keypair(1), NOW + 1800);
        let past_limit = note(&keypair(1), NOW + 1801);

        assert!(p.decide_at(&at_limit, &anon(), NOW).accepted);

        let decision = p.decide_at(&past_limit, &anon(), NOW);
        assert!(!decision.accepted);
        assert!(decision.reason.unwrap().starts_with("invalid:"));
    }

    #[test]
    fn test_old_events_accepted() {
        assert!(policy().decide_at(&note(&keypair(1), 0), &anon(), NOW).accepted);
    }

    #[test]
    fn test_protected_requires_matching_auth() {
        let author = keypair(1);
        let event = EventBuilder::new(1)
            .created_at(NOW)
            .tag(Tag::new(["-"]))
            .sign(&author)
            .unwrap();
        let p = policy();

        let expected = Decision {
            accepted: false,
            reason: Some("auth-required: need to authenticate".into()),
        };
        assert_eq!(p.decide_at(&event, &anon(), NOW), expected);
        assert_eq!(
            p.decide_at(
                &event,
                &AuthContext::authenticated(keypair(2).public_key()),
                NOW
            ),
            expected
        );
        assert!(
            p.decide_at(
                &event,
                &AuthContext::authenticated(author.public_key()),
                NOW
            )
            .accepted
        );
    }

    #[test]
    fn test_invalid_delegation_reason() {
        let event = EventBuilder::new(1)
            .created_at(NOW)
            .tag(Tag::new(["delegation", "abc"]))
            .sign(&keypair(1))
            .unwrap();

        assert_eq!(
            policy().decide_at(&event, &anon(), NOW).reason.as_deref(),
            Some("invalid: malformed delegation")
        );
    }

    #[test]
    fn test_relay_list_reason() {
        let event = EventBuilder::new(10_002)
            .created_at(NOW)
            .tag(Tag::new(["r", "https://relay.example"]))
            .sign(&keypair(1))
            .unwrap();

        assert_eq!(
            policy().decide_at(&event, &anon(), NOW).reason.as_deref(),
            Some("invalid: malformed relay list metadata")
        );
    }

    #[test]
    fn test_block_beats_allow() {
        let author = keypair(1);
        let pk = author.public_key();
        let p = policy_with(AccessSnapshot::new([pk.clone()], [pk]));

        assert_eq!(
            p.evaluate(&note(&author, NOW), &anon(), NOW),
            Err(Rejection::Blocked)
        );
    }

    #[test]
    fn test_allow_list_restricts() {
        let listed = keypair(1);
        let other = keypair(2);
        let p = policy_with(AccessSnapshot::new([listed.public_key()], []));

        assert!(p.decide_at(&note(&listed, NOW), &anon(), NOW).accepted);

        let decision = p.decide_at(&note(&other, NOW), &anon(), NOW);
        assert!(decision.reason.unwrap().starts_with("blocked:"));
    }

    #[test]
    fn test_blocked_delegator_rejected() {
        let delegator = keypair(1);
        let delegatee = keypair(2);
        let tag = Delegation::sign(&delegator, &delegatee.public_key(), "kind=1").unwrap();
        let event = EventBuilder::new(1)
            .created_at(NOW)
            .tag(tag)
            .sign(&delegatee)
            .unwrap();

        assert!(policy().decide_at(&event, &anon(), NOW).accepted);

        let p = policy_with(AccessSnapshot::new([], [delegator.public_key()]));
        assert_eq!(
            p.evaluate(&event, &anon(), NOW),
            Err(Rejection::BlockedDelegator)
        );
    }

    #[test]
    fn test_content_length_boundary() {
        let author = keypair(1);
        let fits = EventBuilder::new(1)
            .created_at(NOW)
            .content("a".repeat(16_384))
            .sign(&author)
            .unwrap();
        let too_long = EventBuilder::new(1)
            .created_at(NOW)
            .content("a".repeat(16_385))
            .sign(&author)
            .unwrap();

        let p = policy();
        assert!(p.decide_at(&fits, &anon(), NOW).accepted);
        assert_eq!(
            p.evaluate(&too_long, &anon(), NOW),
            Err(Rejection::ContentTooLong {
                len: 16_385,
                max: 16_384
            })
        );
    }

    #[test]
    fn test_content_length_counts_bytes() {
        // 4 bytes per character.
        let event = EventBuilder::new(1)
            .created_at(NOW)
            .content("\u{1F600}".repeat(4_097))
            .sign(&keypair(1))
            .unwrap();
        assert!(!policy().decide_at(&event, &anon(), NOW).accepted);
    }

    #[test]
    fn test_first_failure_wins() {
        // Future, blocked and oversized at once: the timestamp check reports.
        let author = keypair(1);
        let event = EventBuilder::new(1)
            .created_at(NOW + 10_000)
            .content("a".repeat(20_000))
            .sign(&author)
            .unwrap();
        let p = policy_with(AccessSnapshot::new([], [author.public_key()]));

        assert!(matches!(
            p.evaluate(&event, &anon(), NOW),
            Err(Rejection::FutureTimestamp { .. })
        ));
    }

    #[test]
    fn test_accept_req_filter_limit() {
        let p = policy();
        let filters = vec![serde_json::json!({"kinds": [1]}); 200];
        assert!(p.accept_req("sub", &filters).accepted);

        let filters = vec![serde_json::json!({}); 201];
        let decision = p.accept_req("sub", &filters);
        assert!(!decision.accepted);
        assert!(decision.reason.unwrap().starts_with("rate-limited:"));
    }

    #[test]
    fn test_reasons_carry_prefixes() {
        let cases = [
            (Rejection::AuthRequired, "auth-required:"),
            (Rejection::NotAllowed, "blocked:"),
            (Rejection::BlockedDelegator, "blocked:"),
            (Rejection::MalformedRelayList, "invalid:"),
            (
                Rejection::TooManyFilters { count: 3, max: 2 },
                "rate-limited:",
            ),
        ];
        for (rejection, prefix) in cases {
            assert!(rejection.to_string().starts_with(prefix), "{rejection:?}");
        }
    }
}
