//! Typed model for AMB educational-resource metadata documents.
//!
//! AMB ("Allgemeines Metadatenprofil für Bildungsressourcen") is a JSON-LD
//! profile built on schema.org and SKOS. The model here is deliberately
//! tolerant: only `id`, `type`, and `name` matter structurally, every other
//! member is optional, and unknown members are kept verbatim in `extra` maps
//! so a document survives a round trip even when it carries vocabulary this
//! tool does not know.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

use crate::error::ConversionError;

/// JSON-LD context URI identifying the AMB profile.
pub const AMB_CONTEXT_URI: &str = "https://w3id.org/kim/amb/context.jsonld";

/// Context value for a rebuilt resource: the profile URI plus a language
/// object naming the default language of plain-string literals.
pub fn amb_context(language: &str) -> Value {
    json!([AMB_CONTEXT_URI, { "@language": language }])
}

/// A member that may hold a single value or a list of values.
///
/// JSON-LD allows either shape, and the flat tag format rebuilds a lone
/// nested entry as a bare object while several entries become an array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Iterate entries regardless of shape.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            OneOrMany::One(value) => std::slice::from_ref(value).iter(),
            OneOrMany::Many(values) => values.iter(),
        }
    }
}

/// A `prefLabel` value: a language → label map, or a plain string in the
/// document's default language.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum LanguageMap {
    Plain(String),
    Localized(BTreeMap<String, String>),
}

/// Controlled-vocabulary reference used by subject, level, audience, and
/// resource-type members.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Concept {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Fixed to `"Concept"` by the AMB profile.
    #[serde(rename = "type", default = "concept_kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pref_label: Option<LanguageMap>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn concept_kind() -> String {
    "Concept".to_string()
}

impl Concept {
    /// Concept pointing at a vocabulary URI, without labels.
    pub fn new(id: impl Into<String>) -> Self {
        Concept {
            id: Some(id.into()),
            kind: concept_kind(),
            pref_label: None,
            extra: Map::new(),
        }
    }

    /// Add one localized label, upgrading a plain label to a map if needed.
    pub fn with_label(mut self, language: impl Into<String>, label: impl Into<String>) -> Self {
        let mut labels = match self.pref_label.take() {
            Some(LanguageMap::Localized(map)) => map,
            _ => BTreeMap::new(),
        };
        labels.insert(language.into(), label.into());
        self.pref_label = Some(LanguageMap::Localized(labels));
        self
    }
}

/// Discriminant for the polymorphic agent members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AgentKind {
    #[default]
    Person,
    Organization,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Person => "Person",
            AgentKind::Organization => "Organization",
        }
    }
}

/// Person or organization appearing as creator, contributor, publisher, or
/// funder.
///
/// The `type` member discriminates the two shapes; honorific prefix and
/// affiliation only occur on persons, `url` only on organizations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: AgentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub honorific_prefix: Option<String>,
    /// Organization the person works for; boxed because agents nest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<Box<Agent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Agent {
    pub fn person(name: impl Into<String>) -> Self {
        Agent {
            name: name.into(),
            kind: AgentKind::Person,
            id: None,
            honorific_prefix: None,
            affiliation: None,
            url: None,
            extra: Map::new(),
        }
    }

    pub fn organization(name: impl Into<String>) -> Self {
        Agent {
            kind: AgentKind::Organization,
            ..Agent::person(name)
        }
    }
}

/// License reference; only the id URL crosses the flat format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct License {
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Lightweight reference to another resource, used by the `hasPart`,
/// `isPartOf`, and `isBasedOn` members.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RelatedResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<OneOrMany<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One AMB learning-resource description.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(rename = "@context", default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    /// Globally unique identifier, usually the resource URL.
    #[serde(default)]
    pub id: String,
    /// Schema.org type labels, e.g. `["LearningResource", "Course"]`.
    #[serde(rename = "type", default, skip_serializing_if = "Vec::is_empty")]
    pub kind: Vec<String>,
    /// Display name of the resource.
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_language: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<OneOrMany<Agent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributor: Option<OneOrMany<Agent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<OneOrMany<Agent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funder: Option<OneOrMany<Agent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
    /// Tri-state: absent means unknown, which is distinct from `false`.
    #[serde(
        default,
        deserialize_with = "bool_or_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_accessible_for_free: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions_of_access: Option<Concept>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about: Option<OneOrMany<Concept>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub educational_level: Option<OneOrMany<Concept>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<OneOrMany<Concept>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_resource_type: Option<OneOrMany<Concept>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_published: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_part: Option<OneOrMany<RelatedResource>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_part_of: Option<OneOrMany<RelatedResource>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_based_on: Option<OneOrMany<RelatedResource>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Parse an AMB document from JSON text.
pub fn parse_resource(data: &str) -> Result<Resource, ConversionError> {
    serde_json::from_str(data).map_err(|e| ConversionError::InvalidInput(e.to_string()))
}

/// Accept a JSON boolean or the strings "true"/"false"; the flat tag format
/// carries the flag as a string.
fn bool_or_string<'de, D>(de: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(de)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(flag)),
        Some(Value::String(text)) => match text.to_ascii_lowercase().as_str() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            other => Err(serde::de::Error::custom(format!(
                "isAccessibleForFree must be a boolean, got \"{other}\""
            ))),
        },
        Some(other) => Err(serde::de::Error::custom(format!(
            "isAccessibleForFree must be a boolean, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_document() {
        let doc = r#"{
            "id": "https://example.org/r1",
            "type": ["LearningResource"],
            "name": "Intro"
        }"#;
        let res = parse_resource(doc).unwrap();
        assert_eq!(res.id, "https://example.org/r1");
        assert_eq!(res.kind, vec!["LearningResource"]);
        assert_eq!(res.name, "Intro");
        assert!(res.extra.is_empty());
    }

    #[test]
    fn missing_required_members_parse_as_empty() {
        let res = parse_resource("{\"name\": \"X\"}").unwrap();
        assert!(res.id.is_empty());
        assert!(res.kind.is_empty());
    }

    #[test]
    fn one_or_many_accepts_both_shapes() {
        let doc = r#"{
            "id": "u", "type": ["LearningResource"], "name": "n",
            "about": [{"id": "c1"}],
            "educationalLevel": {"id": "c2"}
        }"#;
        let res = parse_resource(doc).unwrap();
        assert!(matches!(res.about, Some(OneOrMany::Many(ref v)) if v.len() == 1));
        assert!(matches!(res.educational_level, Some(OneOrMany::One(_))));
    }

    #[test]
    fn agent_discriminant_and_unknown_members() {
        let doc = r#"{
            "id": "u", "type": ["LearningResource"], "name": "n",
            "creator": [{
                "type": "Person",
                "name": "Jane Doe",
                "affiliation": {"name": "Uni", "type": "Organization"},
                "orcid": "0000-0001"
            }]
        }"#;
        let res = parse_resource(doc).unwrap();
        let Some(OneOrMany::Many(creators)) = res.creator else {
            panic!("creator should parse as a list");
        };
        assert_eq!(creators[0].kind, AgentKind::Person);
        let affiliation = creators[0].affiliation.as_ref().unwrap();
        assert_eq!(affiliation.kind, AgentKind::Organization);
        assert_eq!(creators[0].extra["orcid"], json!("0000-0001"));
    }

    #[test]
    fn agent_without_type_defaults_to_person() {
        let agent: Agent = serde_json::from_value(json!({"name": "X"})).unwrap();
        assert_eq!(agent.kind, AgentKind::Person);
    }

    #[test]
    fn pref_label_accepts_string_and_map() {
        let c: Concept = serde_json::from_value(json!({
            "id": "c", "prefLabel": "Informatik"
        }))
        .unwrap();
        assert_eq!(c.pref_label, Some(LanguageMap::Plain("Informatik".into())));
        assert_eq!(c.kind, "Concept");

        let c: Concept = serde_json::from_value(json!({
            "id": "c", "prefLabel": {"de": "Informatik", "en": "Computer Science"}
        }))
        .unwrap();
        let Some(LanguageMap::Localized(map)) = c.pref_label else {
            panic!("expected language map");
        };
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn accessible_flag_accepts_bool_and_string() {
        for doc in [
            "{\"name\": \"n\", \"isAccessibleForFree\": true}",
            "{\"name\": \"n\", \"isAccessibleForFree\": \"true\"}",
        ] {
            let res = parse_resource(doc).unwrap();
            assert_eq!(res.is_accessible_for_free, Some(true));
        }
        let res = parse_resource("{\"name\": \"n\", \"isAccessibleForFree\": \"false\"}").unwrap();
        assert_eq!(res.is_accessible_for_free, Some(false));
        assert!(parse_resource("{\"name\": \"n\", \"isAccessibleForFree\": \"maybe\"}").is_err());
    }

    #[test]
    fn unknown_top_level_members_are_preserved() {
        let doc = r#"{"id": "u", "type": ["X"], "name": "n", "trailer": "https://v"}"#;
        let res = parse_resource(doc).unwrap();
        assert_eq!(res.extra["trailer"], json!("https://v"));
        let out = serde_json::to_value(&res).unwrap();
        assert_eq!(out["trailer"], json!("https://v"));
    }

    #[test]
    fn context_builder_carries_language() {
        let ctx = amb_context("en");
        assert_eq!(ctx[0], json!(AMB_CONTEXT_URI));
        assert_eq!(ctx[1]["@language"], json!("en"));
    }
}
