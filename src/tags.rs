//! Tag grammar shared by the flattener and unflattener.
//!
//! Flat tags use the reserved single-letter keys `d` (resource identifier)
//! and `t` (keyword) plus colon-delimited paths for everything nested:
//! `creator:affiliation:name` addresses the `name` field of a creator's
//! affiliation. Tag order is the only signal separating one array element
//! from the next, so both directions must agree on this grammar.

/// Reserved key carrying the AMB resource identifier.
pub const TAG_IDENTIFIER: &str = "d";
/// Reserved key carrying one keyword per occurrence.
pub const TAG_KEYWORD: &str = "t";
/// Conventional key for relay hints on the flattened event.
pub const TAG_RELAY: &str = "r";

/// Separator between path segments in a nested tag key.
pub const PATH_SEPARATOR: char = ':';

/// Whether a key is reserved for event bookkeeping rather than AMB fields.
pub fn is_reserved(key: &str) -> bool {
    key == TAG_IDENTIFIER || key == TAG_KEYWORD
}

/// The segment before the first separator, or the whole key if it has none.
pub fn base_key(key: &str) -> &str {
    match key.split_once(PATH_SEPARATOR) {
        Some((base, _)) => base,
        None => key,
    }
}

/// Path segments after the base key, empty for a bare key.
pub fn sub_segments(key: &str) -> Vec<&str> {
    match key.split_once(PATH_SEPARATOR) {
        Some((_, rest)) => rest.split(PATH_SEPARATOR).collect(),
        None => Vec::new(),
    }
}

/// Whether the key addresses a nested field.
pub fn is_nested(key: &str) -> bool {
    key.contains(PATH_SEPARATOR)
}
