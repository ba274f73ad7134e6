//! Unflattening engine: ordered Nostr tag list → AMB document.
//!
//! The flat format carries no array or object delimiters, so reconstruction
//! leans on tag order alone. Tags are grouped by base key, then each group is
//! replayed against an accumulator; a new array element starts when a leaf
//! property reappears on the object under construction. This is a heuristic:
//! it only works on streams the flattener (or another order-preserving
//! producer) emitted, and reordered or adversarial streams may reconstruct
//! differently. Known limitation, by design.

use serde_json::{Map, Value};

use crate::amb::{amb_context, Resource};
use crate::error::ConversionError;
use crate::event::{Event, Tag, AMB_EVENT_KIND};
use crate::tags::{base_key, is_nested, is_reserved, sub_segments, TAG_IDENTIFIER, TAG_KEYWORD};

/// Options controlling one unflattening call.
#[derive(Debug, Clone)]
pub struct UnflattenOptions {
    /// Language recorded in the rebuilt JSON-LD context for plain-string
    /// literals.
    pub default_language: String,
}

impl Default for UnflattenOptions {
    fn default() -> Self {
        UnflattenOptions {
            default_language: "de".to_string(),
        }
    }
}

/// Fields the AMB schema requires to be array-typed even when the tag stream
/// reconstructs a single entry.
const ARRAY_FIELDS: [&str; 9] = [
    "type",
    "inLanguage",
    "about",
    "creator",
    "contributor",
    "learningResourceType",
    "audience",
    "publisher",
    "funder",
];

/// Rebuild an AMB resource from a kind-30142 event.
pub fn unflatten(event: &Event, opts: &UnflattenOptions) -> Result<Resource, ConversionError> {
    if event.kind != AMB_EVENT_KIND {
        return Err(ConversionError::InvalidFormat(format!(
            "kind {} is not an AMB metadata event (expected {AMB_EVENT_KIND})",
            event.kind
        )));
    }

    let mut doc = Map::new();
    doc.insert(
        "@context".to_string(),
        amb_context(&opts.default_language),
    );

    // Malformed tags (fewer than two elements) are dropped, never fatal.
    let wellformed: Vec<&Tag> = event.tags.iter().filter(|t| t.0.len() >= 2).collect();

    let mut id: Option<&str> = None;
    let mut keywords: Vec<String> = Vec::new();
    for tag in &wellformed {
        match tag.0[0].as_str() {
            // First d tag wins over any duplicate.
            TAG_IDENTIFIER => {
                if id.is_none() {
                    id = Some(&tag.0[1]);
                }
            }
            TAG_KEYWORD => keywords.push(tag.0[1].clone()),
            _ => {}
        }
    }
    let id = id.ok_or_else(|| ConversionError::MissingRequiredField("id".into()))?;
    doc.insert("id".to_string(), Value::String(id.to_string()));

    // Group the remaining tags by base key, keeping first-seen key order and
    // the original relative order inside each group.
    let mut groups: Vec<(&str, Vec<&Tag>)> = Vec::new();
    for tag in &wellformed {
        let key = tag.0[0].as_str();
        if is_reserved(key) {
            continue;
        }
        let base = base_key(key);
        match groups.iter_mut().find(|(b, _)| *b == base) {
            Some((_, members)) => members.push(*tag),
            None => groups.push((base, vec![*tag])),
        }
    }

    for (base, members) in &groups {
        let value = if members.iter().any(|t| is_nested(&t.0[0])) {
            reconstruct_objects(members)
        } else if members.len() == 1 {
            Value::String(members[0].0[1].clone())
        } else {
            Value::Array(
                members
                    .iter()
                    .map(|t| Value::String(t.0[1].clone()))
                    .collect(),
            )
        };
        doc.insert((*base).to_string(), value);
    }

    for field in ARRAY_FIELDS {
        if let Some(value) = doc.get_mut(field) {
            if !value.is_array() {
                *value = Value::Array(vec![value.take()]);
            }
        }
    }

    if !keywords.is_empty() {
        doc.insert(
            "keywords".to_string(),
            Value::Array(keywords.into_iter().map(Value::String).collect()),
        );
    }

    if !doc.contains_key("name") {
        return Err(ConversionError::MissingRequiredField("name".into()));
    }
    match doc.get("type") {
        Some(Value::Array(kinds)) if !kinds.is_empty() => {}
        _ => return Err(ConversionError::MissingRequiredField("type".into())),
    }

    serde_json::from_value(Value::Object(doc))
        .map_err(|e| ConversionError::ConversionFailed(e.to_string()))
}

/// Replay one group of colon-keyed tags into an object or an array of
/// objects.
///
/// A boundary (start of the next array element) is declared when the leaf
/// property the tag is about to write already exists on its target
/// sub-object; the id-reappearance rule is the common case of that check.
/// The very first tag can never open a boundary because the accumulator is
/// still empty.
fn reconstruct_objects(members: &[&Tag]) -> Value {
    let mut results: Vec<Map<String, Value>> = Vec::new();
    let mut current: Map<String, Value> = Map::new();

    for (position, tag) in members.iter().enumerate() {
        let segments = sub_segments(&tag.0[0]);
        // Bare key mixed into a nested group carries no path to write to.
        let Some((leaf, parents)) = segments.split_last() else {
            continue;
        };
        let value = tag.0[1].as_str();

        // An inLanguage whose parent already holds a localized prefLabel was
        // consumed by the pairing below.
        if *leaf == "inLanguage" {
            if let Some(target) = navigate(&current, parents) {
                if matches!(target.get("prefLabel"), Some(Value::Object(_))) {
                    continue;
                }
            }
        }

        if let Some(target) = navigate(&current, parents) {
            if target.contains_key(*leaf) {
                results.push(std::mem::take(&mut current));
            }
        }

        let target = navigate_or_create(&mut current, parents);
        if *leaf == "prefLabel" {
            // A bare prefLabel may be paired with an inLanguage sibling one
            // position away, encoding a single localized label.
            if let Some(language) = paired_language(members, position, parents) {
                let mut label = Map::new();
                label.insert(language, Value::String(value.to_string()));
                target.insert((*leaf).to_string(), Value::Object(label));
                continue;
            }
        }
        target.insert((*leaf).to_string(), Value::String(value.to_string()));
    }

    if !current.is_empty() {
        results.push(current);
    }
    if results.len() == 1 {
        Value::Object(results.remove(0))
    } else {
        Value::Array(results.into_iter().map(Value::Object).collect())
    }
}

/// Language code of an `inLanguage` sibling one position before or after
/// `position`, sharing the same parent path. Scanned before-first.
fn paired_language(members: &[&Tag], position: usize, parents: &[&str]) -> Option<String> {
    let candidates = [position.checked_sub(1), position.checked_add(1)];
    for candidate in candidates.into_iter().flatten() {
        let Some(tag) = members.get(candidate) else {
            continue;
        };
        let segments = sub_segments(&tag.0[0]);
        let Some((leaf, tag_parents)) = segments.split_last() else {
            continue;
        };
        if *leaf == "inLanguage" && tag_parents == parents {
            return Some(tag.0[1].clone());
        }
    }
    None
}

/// Follow `parents` through nested objects, read-only. `None` when any hop is
/// missing or not an object.
fn navigate<'a>(obj: &'a Map<String, Value>, parents: &[&str]) -> Option<&'a Map<String, Value>> {
    let mut cursor = obj;
    for segment in parents {
        cursor = cursor.get(*segment)?.as_object()?;
    }
    Some(cursor)
}

/// Follow `parents`, creating empty objects along the way. A non-object in
/// the path is replaced; the colon grammar says it must hold sub-fields.
fn navigate_or_create<'a>(
    obj: &'a mut Map<String, Value>,
    parents: &[&str],
) -> &'a mut Map<String, Value> {
    let mut cursor = obj;
    for segment in parents {
        let slot = cursor
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(next) = slot else {
            unreachable!("slot was just made an object");
        };
        cursor = next;
    }
    cursor
}
