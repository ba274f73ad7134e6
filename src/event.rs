//! Nostr event model for flattened AMB metadata.

use serde::{Deserialize, Serialize};

use crate::error::ConversionError;

/// Kind number identifying an AMB metadata event.
pub const AMB_EVENT_KIND: u32 = 30142;

/// Placeholder public key used when the caller supplies none.
///
/// All zeros is recognizably unsigned; real events replace it at signing time.
pub const DEFAULT_PUBKEY: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Wrapper for a Nostr tag expressed as an array of strings.
///
/// The first element is the key, the second the value. AMB events use the
/// reserved keys `d` (resource identifier) and `t` (keyword) plus
/// colon-delimited field paths such as `creator:affiliation:name`. For
/// example, a `["t", "physics"]` tag is represented as
/// `Tag(vec!["t".into(), "physics".into()])` and stored verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag(pub Vec<String>);

impl Tag {
    /// Build a two-element key/value tag.
    pub fn pair(key: impl Into<String>, value: impl Into<String>) -> Self {
        Tag(vec![key.into(), value.into()])
    }
}

/// Addressable Nostr event carrying one flattened AMB resource.
///
/// ```json
/// {
///   "pubkey": "aa11...",
///   "kind": 30142,
///   "created_at": 1700000000,
///   "tags": [["d", "https://example.org/r1"], ["name", "Course"]],
///   "content": ""
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    /// Event identifier (hex of SHA-256 hash), present once signed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Author public key (64 lowercase hex characters).
    pub pubkey: String,
    /// Kind number, always [`AMB_EVENT_KIND`] for this tool.
    pub kind: u32,
    /// Unix timestamp of creation.
    pub created_at: u64,
    /// Ordered flat tags encoding the AMB resource.
    pub tags: Vec<Tag>,
    /// Always empty for AMB metadata events.
    pub content: String,
    /// Schnorr signature over the event hash, present once signed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sig: Option<String>,
}

/// Parse an event from JSON text.
pub fn parse_event(data: &str) -> Result<Event, ConversionError> {
    serde_json::from_str(data).map_err(|e| ConversionError::InvalidInput(e.to_string()))
}
