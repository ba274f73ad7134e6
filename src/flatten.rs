//! Flattening engine: AMB document → ordered Nostr tag list.
//!
//! Emission order is fixed and deterministic. The unflattener has no array or
//! object delimiters to work with, only tag order, so the two directions must
//! agree on this sequence exactly.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::amb::{Agent, Concept, LanguageMap, Resource};
use crate::error::ConversionError;
use crate::event::{Event, Tag, AMB_EVENT_KIND, DEFAULT_PUBKEY};
use crate::tags::{TAG_IDENTIFIER, TAG_KEYWORD, TAG_RELAY};

/// Options controlling one flattening call.
#[derive(Debug, Clone)]
pub struct FlattenOptions {
    /// Author public key; the all-zero placeholder is used when absent.
    pub pubkey: Option<String>,
    /// Fixed `created_at`; wall clock when absent.
    pub timestamp: Option<u64>,
    /// Emit `hasPart`/`isPartOf`/`isBasedOn` tags.
    pub include_relationships: bool,
    /// Pin the default timestamp to zero so unsigned bytes are reproducible.
    pub deterministic_ids: bool,
    /// Relay URLs emitted as `r` tags.
    pub relay_hints: Vec<String>,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        FlattenOptions {
            pubkey: None,
            timestamp: None,
            include_relationships: true,
            deterministic_ids: false,
            relay_hints: Vec::new(),
        }
    }
}

/// A flattened event plus informational warnings collected along the way.
#[derive(Debug, Clone)]
pub struct Flattened {
    pub event: Event,
    pub warnings: Vec<String>,
}

/// Flatten an AMB resource into an unsigned kind-30142 event.
pub fn flatten(resource: &Resource, opts: &FlattenOptions) -> Result<Flattened, ConversionError> {
    if resource.id.is_empty() {
        return Err(ConversionError::MissingRequiredField("id".into()));
    }
    if resource.name.is_empty() {
        return Err(ConversionError::MissingRequiredField("name".into()));
    }

    let mut warnings = Vec::new();
    let pubkey = match &opts.pubkey {
        Some(pk) => pk.clone(),
        None => {
            warnings.push("no pubkey supplied, using default pubkey".to_string());
            DEFAULT_PUBKEY.to_string()
        }
    };
    let created_at = match opts.timestamp {
        Some(ts) => ts,
        None if opts.deterministic_ids => 0,
        None => unix_now(),
    };

    let mut tags = Vec::new();
    tags.push(Tag::pair(TAG_IDENTIFIER, &resource.id));
    for kind in &resource.kind {
        tags.push(Tag::pair("type", kind));
    }
    tags.push(Tag::pair("name", &resource.name));
    if let Some(description) = &resource.description {
        tags.push(Tag::pair("description", description));
    }
    if let Some(keywords) = &resource.keywords {
        for keyword in keywords {
            tags.push(Tag::pair(TAG_KEYWORD, keyword.to_lowercase()));
        }
    }
    if let Some(languages) = &resource.in_language {
        for language in languages {
            tags.push(Tag::pair("inLanguage", language));
        }
    }

    if let Some(creators) = &resource.creator {
        for creator in creators.iter() {
            emit_creator(&mut tags, creator);
        }
    }
    if let Some(publishers) = &resource.publisher {
        for publisher in publishers.iter() {
            tags.push(Tag::pair("publisher:name", &publisher.name));
            tags.push(Tag::pair("publisher:type", publisher.kind.as_str()));
            if let Some(id) = &publisher.id {
                tags.push(Tag::pair("publisher:id", id));
            }
        }
    }
    if let Some(license) = &resource.license {
        tags.push(Tag::pair("license:id", &license.id));
    }
    if let Some(free) = resource.is_accessible_for_free {
        tags.push(Tag::pair("isAccessibleForFree", if free { "true" } else { "false" }));
    }
    if let Some(conditions) = &resource.conditions_of_access {
        emit_concept(&mut tags, "conditionsOfAccess", conditions);
    }
    for (field, concepts) in [
        ("about", &resource.about),
        ("educationalLevel", &resource.educational_level),
        ("audience", &resource.audience),
        ("learningResourceType", &resource.learning_resource_type),
    ] {
        if let Some(concepts) = concepts {
            for concept in concepts.iter() {
                emit_concept(&mut tags, field, concept);
            }
        }
    }

    if let Some(date) = &resource.date_published {
        tags.push(Tag::pair("datePublished", date));
    }
    if let Some(date) = &resource.date_created {
        tags.push(Tag::pair("dateCreated", date));
    }
    if let Some(image) = &resource.image {
        tags.push(Tag::pair("image", image));
    }
    for relay in &opts.relay_hints {
        tags.push(Tag::pair(TAG_RELAY, relay));
    }

    if opts.include_relationships {
        for (field, related) in [
            ("hasPart", &resource.has_part),
            ("isPartOf", &resource.is_part_of),
        ] {
            if let Some(related) = related {
                for entry in related.iter() {
                    if let Some(id) = &entry.id {
                        tags.push(Tag::pair(format!("{field}:id"), id));
                    }
                    if let Some(name) = &entry.name {
                        tags.push(Tag::pair(format!("{field}:name"), name));
                    }
                    if let Some(kinds) = &entry.kind {
                        for kind in kinds.iter() {
                            tags.push(Tag::pair(format!("{field}:type"), kind));
                        }
                    }
                }
            }
        }
        if let Some(based_on) = &resource.is_based_on {
            for entry in based_on.iter() {
                if let Some(id) = &entry.id {
                    tags.push(Tag::pair("isBasedOn:id", id));
                }
                if let Some(name) = &entry.name {
                    tags.push(Tag::pair("isBasedOn:name", name));
                }
            }
        }
    }

    let event = Event {
        id: None,
        pubkey,
        kind: AMB_EVENT_KIND,
        created_at,
        tags,
        content: String::new(),
        sig: None,
    };
    Ok(Flattened { event, warnings })
}

/// One creator block: merged display name, discriminant, then the optional
/// person fields and affiliation.
fn emit_creator(tags: &mut Vec<Tag>, creator: &Agent) {
    let display_name = match &creator.honorific_prefix {
        Some(prefix) => format!("{prefix} {}", creator.name),
        None => creator.name.clone(),
    };
    tags.push(Tag::pair("creator:name", display_name));
    tags.push(Tag::pair("creator:type", creator.kind.as_str()));
    if let Some(id) = &creator.id {
        tags.push(Tag::pair("creator:id", id));
    }
    if let Some(prefix) = &creator.honorific_prefix {
        tags.push(Tag::pair("creator:honorificPrefix", prefix));
    }
    if let Some(affiliation) = &creator.affiliation {
        tags.push(Tag::pair("creator:affiliation:name", &affiliation.name));
        tags.push(Tag::pair(
            "creator:affiliation:type",
            affiliation.kind.as_str(),
        ));
        if let Some(id) = &affiliation.id {
            tags.push(Tag::pair("creator:affiliation:id", id));
        }
    }
}

/// One concept block: id, labels, then the fixed type.
fn emit_concept(tags: &mut Vec<Tag>, field: &str, concept: &Concept) {
    if let Some(id) = &concept.id {
        tags.push(Tag::pair(format!("{field}:id"), id));
    }
    match &concept.pref_label {
        Some(LanguageMap::Localized(labels)) => {
            for (language, label) in labels {
                tags.push(Tag::pair(format!("{field}:prefLabel:{language}"), label));
            }
        }
        Some(LanguageMap::Plain(label)) => {
            tags.push(Tag::pair(format!("{field}:prefLabel"), label));
        }
        None => {}
    }
    tags.push(Tag::pair(format!("{field}:type"), &concept.kind));
}

fn unix_now() -> u64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs(),
        Err(_) => 0,
    }
}
