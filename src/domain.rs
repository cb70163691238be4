use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Property keys that carry pipeline structure rather than type-specific data
pub const RESERVED_PROPERTY_KEYS: &[&str] = &[
    "@id",
    "@type",
    "name",
    "type",
    "description",
    "sources",
    "citations",
    "citation",
    "references",
    "wikidata_id",
    "wikidataId",
    "wikidata",
    "identifier",
    "sameAs",
    "wikipedia",
    "wikipedia_url",
];

/// The canonical entity types a Sachstand can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityType {
    Person,
    Organization,
    Event,
    Topic,
    Policy,
}

impl EntityType {
    pub const ALL: [EntityType; 5] = [
        EntityType::Person,
        EntityType::Organization,
        EntityType::Event,
        EntityType::Topic,
        EntityType::Policy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Person => "Person",
            EntityType::Organization => "Organization",
            EntityType::Event => "Event",
            EntityType::Topic => "Topic",
            EntityType::Policy => "Policy",
        }
    }

    /// schema.org vocabulary type used in the output document
    pub fn schema_org_type(&self) -> &'static str {
        match self {
            EntityType::Person => "Person",
            EntityType::Organization => "Organization",
            EntityType::Event => "Event",
            EntityType::Topic => "Thing",
            EntityType::Policy => "Legislation",
        }
    }

    /// Property keys of which at least one must be set for the type bonus.
    /// Types without a required property never earn it.
    pub fn required_property_keys(&self) -> &'static [&'static str] {
        match self {
            EntityType::Person => &["jobTitle"],
            EntityType::Organization => &["url", "website"],
            EntityType::Event | EntityType::Topic | EntityType::Policy => &[],
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A citation exactly as the agent claimed it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSource {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

impl RawSource {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            excerpt: None,
        }
    }
}

/// One entity mention extracted from agent output, before any checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEntityRecord {
    pub name: String,
    pub declared_type: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub sources: Vec<RawSource>,
}

impl RawEntityRecord {
    pub fn description(&self) -> Option<&str> {
        self.properties
            .get("description")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

/// Outcome of a live accessibility check for one source URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlVerification {
    /// Only syntactic and blacklist checks ran
    NotChecked,
    Accessible,
    /// The check timed out or failed on the network; the source stays usable
    Unverified,
    /// The server answered that the page does not exist
    Unreachable,
}

/// A source that survived validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySource {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    pub verification: UrlVerification,
}

impl EntitySource {
    pub fn from_raw(source: &RawSource, verification: UrlVerification) -> Self {
        Self {
            url: source.url.trim().to_string(),
            title: source.title.clone(),
            excerpt: source.excerpt.clone(),
            verification,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikipediaLink {
    pub language: String,
    pub url: String,
}

/// Authoritative identifiers attached to an entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wikidata_id: Option<String>,
    #[serde(default)]
    pub wikipedia_links: Vec<WikipediaLink>,
}

impl ExternalIds {
    pub fn has_reference_link(&self) -> bool {
        self.wikidata_id.is_some() || !self.wikipedia_links.is_empty()
    }

    /// Union with another id set. An existing Wikidata id is never replaced.
    pub fn absorb(&mut self, other: &ExternalIds) {
        if self.wikidata_id.is_none() {
            self.wikidata_id = other.wikidata_id.clone();
        }
        for link in &other.wikipedia_links {
            if !self.wikipedia_links.iter().any(|l| l.url == link.url) {
                self.wikipedia_links.push(link.clone());
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Valid,
    Rejected,
}

/// Findings of the entity validator. The snake_case code is the histogram key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationIssue {
    NameTooShort,
    UnknownType,
    NoSources,
    InvalidUrl,
    BlacklistedSource,
    UnreachableSource,
    AllSourcesInvalid,
    MissingDescription,
    ShortDescription,
    LowQualityScore,
}

impl ValidationIssue {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationIssue::NameTooShort => "name_too_short",
            ValidationIssue::UnknownType => "unknown_type",
            ValidationIssue::NoSources => "no_sources",
            ValidationIssue::InvalidUrl => "invalid_url",
            ValidationIssue::BlacklistedSource => "blacklisted_source",
            ValidationIssue::UnreachableSource => "unreachable_source",
            ValidationIssue::AllSourcesInvalid => "all_sources_invalid",
            ValidationIssue::MissingDescription => "missing_description",
            ValidationIssue::ShortDescription => "short_description",
            ValidationIssue::LowQualityScore => "low_quality_score",
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw record after the quality gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedEntity {
    pub record: RawEntityRecord,
    /// `None` when the declared type is not a known entity type
    pub entity_type: Option<EntityType>,
    /// Sources that passed the syntax, blacklist and accessibility checks
    pub sources: Vec<EntitySource>,
    pub external_ids: ExternalIds,
    pub quality_score: f64,
    pub validation_status: ValidationStatus,
    pub rejection_reasons: Vec<ValidationIssue>,
    /// Findings on entities that were kept anyway
    pub warnings: Vec<ValidationIssue>,
    pub has_authoritative_source: bool,
}

impl ValidatedEntity {
    pub fn is_valid(&self) -> bool {
        self.validation_status == ValidationStatus::Valid
    }

    pub fn name(&self) -> &str {
        self.record.name.trim()
    }
}

/// The deduplicated form of an entity as emitted into the Sachstand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEntity {
    pub id: String,
    pub entity_type: EntityType,
    pub name: String,
    pub description: String,
    pub type_specific_properties: Map<String, Value>,
    pub sources: Vec<EntitySource>,
    pub external_ids: ExternalIds,
    pub quality_score: f64,
}

impl CanonicalEntity {
    pub fn has_required_property(&self) -> bool {
        self.entity_type
            .required_property_keys()
            .iter()
            .any(|key| property_is_set(&self.type_specific_properties, key))
    }
}

/// Whether a property holds something other than null or blank text
pub fn property_is_set(properties: &Map<String, Value>, key: &str) -> bool {
    match properties.get(key) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}
