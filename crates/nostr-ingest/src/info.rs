//! Relay information document (NIP-11) and the admin statistics body.

use serde::{Deserialize, Serialize};

use crate::policy::Limits;

/// Crate version reported by `/info` and the information document.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The `[info]` configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InfoConfig {
    pub name: String,
    pub description: String,
    pub pubkey: Option<String>,
    pub contact: Option<String>,
    pub software: String,
    pub icon: Option<String>,
    pub supported_nips: Vec<u32>,
}

impl Default for InfoConfig {
    fn default() -> Self {
        Self {
            name: "nostr-relay".to_owned(),
            description: "relay powered by nostr-ingest".to_owned(),
            pubkey: None,
            contact: None,
            software: "https://github.com/nostr-ingest/nostr-ingest".to_owned(),
            icon: None,
            supported_nips: vec![
                1, 2, 4, 9, 11, 12, 15, 16, 20, 22, 26, 28, 33, 40, 42, 45, 50, 56, 65, 70,
            ],
        }
    }
}

/// The `limitation` object of the information document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limitation {
    pub max_message_length: usize,
    pub max_subscriptions: usize,
    pub max_filters: usize,
    pub max_limit: usize,
    pub max_subid_length: usize,
    pub max_event_tags: usize,
    pub max_content_length: usize,
    pub min_pow_difficulty: u32,
    pub auth_required: bool,
    pub payment_required: bool,
}

impl From<&Limits> for Limitation {
    fn from(limits: &Limits) -> Self {
        Self {
            max_message_length: limits.max_message_length,
            max_subscriptions: limits.max_subscriptions,
            max_filters: limits.max_filters,
            max_limit: limits.max_limit,
            max_subid_length: limits.max_subid_length,
            max_event_tags: limits.max_event_tags,
            max_content_length: limits.max_content_length,
            min_pow_difficulty: 0,
            auth_required: false,
            payment_required: false,
        }
    }
}

/// NIP-11 relay information document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayInformation {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    pub supported_nips: Vec<u32>,
    pub software: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub limitation: Limitation,
}

impl RelayInformation {
    pub fn new(info: &InfoConfig, limits: &Limits) -> Self {
        Self {
            name: info.name.clone(),
            description: info.description.clone(),
            pubkey: info.pubkey.clone(),
            contact: info.contact.clone(),
            supported_nips: info.supported_nips.clone(),
            software: info.software.clone(),
            version: VERSION.to_owned(),
            icon: info.icon.clone(),
            limitation: Limitation::from(limits),
        }
    }
}

impl Default for RelayInformation {
    fn default() -> Self {
        Self::new(&InfoConfig::default(), &Limits::default())
    }
}

/// Body of `GET /info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayStats {
    pub version: String,
    pub num_events: u64,
    pub num_sessions: u64,
    pub supported_nips: Vec<u32>,
}
