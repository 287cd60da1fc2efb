//! Canonical serialization for event ids and delegation tokens.
//!
//! The event id is the sha256 of the compact JSON array
//! `[0, pubkey, created_at, kind, tags, content]`. serde_json's compact
//! writer emits no whitespace and escapes exactly the characters the wire
//! format requires, so its output is the canonical form.

use crate::crypto::Sha256Hash;
use crate::error::CoreError;
use crate::event::Tag;
use crate::types::{EventId, PublicKey};

/// Prefix of the string a delegator signs.
pub const DELEGATION_PREFIX: &str = "nostr:delegation:";

/// Encode the canonical id preimage.
pub fn canonical_json(
    pubkey: &PublicKey,
    created_at: u64,
    kind: u32,
    tags: &[Tag],
    content: &str,
) -> Result<String, CoreError> {
    serde_json::to_string(&(0u8, pubkey, created_at, kind, tags, content))
        .map_err(|e| CoreError::EncodingError(e.to_string()))
}

/// Compute the content-addressed id for the given fields.
pub fn compute_event_id(
    pubkey: &PublicKey,
    created_at: u64,
    kind: u32,
    tags: &[Tag],
    content: &str,
) -> Result<EventId, CoreError> {
    let json = canonical_json(pubkey, created_at, kind, tags, content)?;
    Ok(EventId::from_bytes(Sha256Hash::hash(json.as_bytes()).0))
}

/// The string a delegator signs to authorize `delegatee` under `conditions`.
pub fn delegation_token(delegatee: &PublicKey, conditions: &str) -> String {
    format!("{}{}:{}", DELEGATION_PREFIX, delegatee, conditions)
}

/// Digest of [`delegation_token`].
pub fn delegation_digest(delegatee: &PublicKey, conditions: &str) -> Sha256Hash {
    Sha256Hash::hash(delegation_token(delegatee, conditions).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_json_shape() {
        let pk = PublicKey::new("ab".repeat(32));
        let tags = vec![Tag::new(["e", "ff"]), Tag::new(["d", ""])];
        let json = canonical_json(&pk, 1_700_000_000, 1, &tags, "hi\n\"there\"").unwrap();
        assert_eq!(
            json,
            format!(
                "[0,\"{}\",1700000000,1,[[\"e\",\"ff\"],[\"d\",\"\"]],\"hi\\n\\\"there\\\"\"]",
                pk
            )
        );
    }

    #[test]
    fn test_id_depends_on_every_field() {
        let pk = PublicKey::new("ab".repeat(32));
        let base = compute_event_id(&pk, 10, 1, &[], "x").unwrap();

        assert_ne!(base, compute_event_id(&pk, 11, 1, &[], "x").unwrap());
        assert_ne!(base, compute_event_id(&pk, 10, 2, &[], "x").unwrap());
        assert_ne!(base, compute_event_id(&pk, 10, 1, &[], "y").unwrap());
        assert_ne!(
            base,
            compute_event_id(&pk, 10, 1, &[Tag::new(["t", "a"])], "x").unwrap()
        );
        assert!(base.is_well_formed());
    }

    #[test]
    fn test_delegation_token_format() {
        let pk = PublicKey::new("477318cfb5427b9cfc66a9fa376150c1ddbc62115ae27cef72417eb959691396");
        assert_eq!(
            delegation_token(&pk, "kind=1&created_at<1700000000"),
            "nostr:delegation:477318cfb5427b9cfc66a9fa376150c1ddbc62115ae27cef72417eb959691396:kind=1&created_at<1700000000"
        );
    }
}
