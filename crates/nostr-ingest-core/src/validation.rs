//! Kind-specific structural validation.

use crate::error::ValidationError;
use crate::event::Event;
use crate::kind::KIND_RELAY_LIST;

/// Name of the relay-url tag in relay list metadata.
pub const RELAY_TAG: &str = "r";

const WEBSOCKET_SCHEMES: [&str; 2] = ["wss://", "ws://"];

/// Validate kind-specific structure. Kinds without rules always pass.
pub fn validate_kind_structure(event: &Event) -> Result<(), ValidationError> {
    match event.kind {
        KIND_RELAY_LIST => validate_relay_list(event),
        _ => Ok(()),
    }
}

/// Validate a relay list metadata event.
///
/// Checks, in order:
/// 1. Content is empty
/// 2. Every `r` tag carries a non-empty url
/// 3. Every url uses a websocket scheme
///
/// Tags with other names are ignored.
pub fn validate_relay_list(event: &Event) -> Result<(), ValidationError> {
    // 1. Content
    if !event.content.is_empty() {
        return Err(ValidationError::RelayListContent);
    }

    for (index, tag) in event.tags.iter().enumerate() {
        if tag.name() != Some(RELAY_TAG) {
            continue;
        }

        // 2. Url present
        let url = match tag.value() {
            Some(url) if !url.is_empty() => url,
            _ => return Err(ValidationError::RelayListMissingUrl { index }),
        };

        // 3. Scheme
        if !WEBSOCKET_SCHEMES.iter().any(|s| url.starts_with(s)) {
            return Err(ValidationError::RelayListScheme {
                url: url.to_owned(),
            });
        }
    }

    Ok(())
}
