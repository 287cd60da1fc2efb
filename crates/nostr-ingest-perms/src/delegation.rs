//! Delegated event signing.
//!
//! A delegation tag lets one identity (the delegatee, who signs the event)
//! publish on behalf of another (the delegator) within bounded conditions:
//!
//! ```text
//! ["delegation", <delegator pubkey>, <conditions>, <delegation signature>]
//! ```
//!
//! Conditions are `&`-separated clauses of the forms `kind=<n>`,
//! `created_at<<t>` and `created_at><t>`. The delegation signature is a
//! Schnorr signature by the delegator over
//! `sha256("nostr:delegation:<delegatee>:<conditions>")`.

use std::str::FromStr;

use nostr_ingest_core::types::{is_hex_of_len, HEX_32_LEN};
use nostr_ingest_core::{delegation_digest, verify_schnorr, Event, Keypair, PublicKey, Tag};

use crate::error::{PermsError, Result};

/// Name of the delegation tag.
pub const DELEGATION_TAG: &str = "delegation";

/// A single delegation condition clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// `kind=<n>`: events of this kind are permitted.
    Kind(u32),
    /// `created_at<<t>`: events must be created strictly before `t`.
    CreatedBefore(u64),
    /// `created_at><t>`: events must be created strictly after `t`.
    CreatedAfter(u64),
}

impl FromStr for Condition {
    type Err = PermsError;

    fn from_str(clause: &str) -> Result<Self> {
        let invalid = || PermsError::InvalidConditions(clause.to_owned());

        if let Some(n) = clause.strip_prefix("kind=") {
            n.parse().map(Condition::Kind).map_err(|_| invalid())
        } else if let Some(t) = clause.strip_prefix("created_at<") {
            t.parse().map(Condition::CreatedBefore).map_err(|_| invalid())
        } else if let Some(t) = clause.strip_prefix("created_at>") {
            t.parse().map(Condition::CreatedAfter).map_err(|_| invalid())
        } else {
            Err(invalid())
        }
    }
}

/// Parsed delegation conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conditions {
    clauses: Vec<Condition>,
}

impl Conditions {
    pub fn clauses(&self) -> &[Condition] {
        &self.clauses
    }

    /// Whether an event of `kind` created at `created_at` is permitted.
    ///
    /// Some kind clause must name the kind, and every time bound must hold.
    /// Conditions without any kind clause permit nothing.
    pub fn permits(&self, kind: u32, created_at: u64) -> bool {
        let kind_ok = self
            .clauses
            .iter()
            .any(|c| matches!(c, Condition::Kind(k) if *k == kind));

        kind_ok
            && self.clauses.iter().all(|c| match *c {
                Condition::Kind(_) => true,
                Condition::CreatedBefore(t) => created_at < t,
                Condition::CreatedAfter(t) => created_at > t,
            })
    }
}

impl FromStr for Conditions {
    type Err = PermsError;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(PermsError::InvalidConditions(String::new()));
        }
        let clauses = s
            .split('&')
            .map(str::parse)
            .collect::<Result<Vec<Condition>>>()?;
        Ok(Self { clauses })
    }
}

/// A parsed delegation tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delegation {
    pub delegator: PublicKey,
    /// The conditions exactly as signed.
    pub raw_conditions: String,
    pub conditions: Conditions,
    pub signature: String,
}

impl Delegation {
    /// Extract the delegation from an event, if it carries one.
    ///
    /// Only the first `delegation` tag is considered.
    pub fn from_event(event: &Event) -> Result<Option<Self>> {
        match event.first_tag(DELEGATION_TAG) {
            Some(tag) => Self::from_tag(tag).map(Some),
            None => Ok(None),
        }
    }

    /// Parse a tag that is already known to be a delegation tag.
    pub fn from_tag(tag: &Tag) -> Result<Self> {
        let [_, delegator, conditions, signature] = tag.0.as_slice() else {
            return Err(PermsError::MalformedDelegation(format!(
                "expected 4 fields, got {}",
                tag.len()
            )));
        };

        if !is_hex_of_len(delegator, HEX_32_LEN) {
            return Err(PermsError::MalformedDelegation(
                "delegator is not a 32-byte hex key".into(),
            ));
        }
        if conditions.is_empty() || signature.is_empty() {
            return Err(PermsError::MalformedDelegation(
                "empty conditions or signature".into(),
            ));
        }

        Ok(Self {
            delegator: PublicKey::new(delegator.as_str()),
            raw_conditions: conditions.clone(),
            conditions: conditions.parse()?,
            signature: signature.clone(),
        })
    }

    /// Check the conditions and the delegator's signature against `event`.
    pub fn verify(&self, event: &Event) -> Result<()> {
        if !self.conditions.permits(event.kind, event.created_at) {
            return Err(PermsError::DelegationForbidden {
                kind: event.kind,
                created_at: event.created_at,
            });
        }

        let digest = delegation_digest(&event.pubkey, &self.raw_conditions);
        verify_schnorr(self.delegator.as_str(), &digest, &self.signature)
            .map_err(|_| PermsError::InvalidDelegationSignature)
    }

    /// Build a signed delegation tag granting `delegatee` the `conditions`.
    pub fn sign(delegator: &Keypair, delegatee: &PublicKey, conditions: &str) -> Result<Tag> {
        conditions.parse::<Conditions>()?;
        let signature = delegator.sign(&delegation_digest(delegatee, conditions))?;
        Ok(Tag::new([
            DELEGATION_TAG.to_owned(),
            delegator.public_key().to_string(),
            conditions.to_owned(),
            signature,
        ]))
    }
}

/// Validate the delegation carried by `event`.
///
/// Returns the delegator when a valid delegation is present, `None` when
/// the event carries no delegation tag at all.
pub fn validate_delegation(event: &Event) -> Result<Option<PublicKey>> {
    match Delegation::from_event(event)? {
        Some(delegation) => {
            delegation.verify(event)?;
            Ok(Some(delegation.delegator))
        }
        None => Ok(None),
    }
}

/// Boolean form of [`validate_delegation`]: absent delegations pass.
pub fn delegation_is_valid(event: &Event) -> bool {
    validate_delegation(event).is_ok()
}
