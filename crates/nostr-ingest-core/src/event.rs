//! The Event type and its builder.
//!
//! An event arrives fully formed from the protocol layer. Its id and
//! signature are trusted inputs here; [`Event::verify`] exists for fixtures
//! and tooling that need to check them.

use serde::{Deserialize, Serialize};

use crate::canonical::compute_event_id;
use crate::crypto::{verify_schnorr, Keypair, Sha256Hash};
use crate::error::CoreError;
use crate::kind::{KindClass, ReplacementKey};
use crate::types::{EventId, PublicKey};

/// Name of the tag marking an event as protected.
pub const PROTECTED_TAG: &str = "-";

/// Name of the expiration tag.
pub const EXPIRATION_TAG: &str = "expiration";

/// A tag: element 0 is the name, the rest are positional values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(pub Vec<String>);

impl Tag {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(fields.into_iter().map(Into::into).collect())
    }

    /// The tag name, if the tag has any fields at all.
    pub fn name(&self) -> Option<&str> {
        self.get(0)
    }

    /// The first positional value.
    pub fn value(&self) -> Option<&str> {
        self.get(1)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A signed protocol event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub pubkey: PublicKey,
    pub created_at: u64,
    pub kind: u32,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub content: String,
    pub sig: String,
}

impl Event {
    /// Parse from the wire JSON object.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        serde_json::from_str(json).map_err(|e| CoreError::DecodingError(e.to_string()))
    }

    /// Encode to the wire JSON object.
    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string(self).map_err(|e| CoreError::EncodingError(e.to_string()))
    }

    pub fn kind_class(&self) -> KindClass {
        KindClass::of(self.kind)
    }

    /// The storage slot this event competes for, if its kind is replaceable.
    pub fn replacement_key(&self) -> Option<ReplacementKey> {
        ReplacementKey::for_event(self)
    }

    /// First tag with the given name.
    pub fn first_tag(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.name() == Some(name))
    }

    /// Value of the first tag with the given name.
    pub fn first_tag_value(&self, name: &str) -> Option<&str> {
        self.first_tag(name).and_then(Tag::value)
    }

    pub fn tags_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Tag> + 'a {
        self.tags.iter().filter(move |t| t.name() == Some(name))
    }

    /// Protected events may only be published by their author.
    pub fn is_protected(&self) -> bool {
        self.first_tag(PROTECTED_TAG).is_some()
    }

    /// The expiration timestamp, if a parseable expiration tag is present.
    pub fn expiration(&self) -> Option<u64> {
        self.first_tag_value(EXPIRATION_TAG)
            .and_then(|v| v.trim().parse().ok())
    }

    /// True once `now` has reached the expiration timestamp.
    pub fn is_expired(&self, now: u64) -> bool {
        self.expiration().is_some_and(|exp| exp <= now)
    }

    /// Recompute the canonical id from the event fields.
    pub fn compute_id(&self) -> Result<EventId, CoreError> {
        compute_event_id(
            &self.pubkey,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
        )
    }

    /// Check that the id matches the fields and the signature matches the id.
    pub fn verify(&self) -> Result<(), CoreError> {
        let computed = self.compute_id()?;
        if computed != self.id {
            return Err(CoreError::IdMismatch {
                expected: computed,
                actual: self.id.clone(),
            });
        }

        let mut digest = [0u8; 32];
        hex::decode_to_slice(self.id.as_str(), &mut digest)
            .map_err(|e| CoreError::DecodingError(e.to_string()))?;
        verify_schnorr(self.pubkey.as_str(), &Sha256Hash(digest), &self.sig)
    }
}

/// Builder for signed events.
#[derive(Debug, Clone)]
pub struct EventBuilder {
    kind: u32,
    created_at: u64,
    tags: Vec<Tag>,
    content: String,
}

impl EventBuilder {
    pub fn new(kind: u32) -> Self {
        Self {
            kind,
            created_at: 0,
            tags: Vec::new(),
            content: String::new(),
        }
    }

    pub fn created_at(mut self, created_at: u64) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    pub fn tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags.extend(tags);
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Compute the id and sign it.
    pub fn sign(self, keypair: &Keypair) -> Result<Event, CoreError> {
        let pubkey = keypair.public_key();
        let id = compute_event_id(&pubkey, self.created_at, self.kind, &self.tags, &self.content)?;

        let mut digest = [0u8; 32];
        hex::decode_to_slice(id.as_str(), &mut digest)
            .map_err(|e| CoreError::EncodingError(e.to_string()))?;
        let sig = keypair.sign(&Sha256Hash(digest))?;

        Ok(Event {
            id,
            pubkey,
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags,
            content: self.content,
            sig,
        })
    }
}
