//! Renders canonical entities into the schema.org typed Sachstand document.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

use crate::constants::{CITATION_TYPE, DOCUMENT_TYPE, SCHEMA_ORG_CONTEXT, WIKIDATA_ENTITY_PREFIX};
use crate::domain::{CanonicalEntity, RESERVED_PROPERTY_KEYS};
use crate::error::Result;
use crate::pipeline::processing::normalize::FormatWarning;
use crate::pipeline::processing::validation_metrics::ValidationMetrics;

/// Keys the renderer writes itself; properties with these names are dropped
const RENDERED_KEYS: &[&str] = &["citation", "sameAs", "identifier", "name", "description"];

/// How the upstream research run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionSignal {
    /// Ran to completion with no remaining work
    Finished,
    /// An interaction or time budget ran out
    BudgetExhausted,
    /// Stopped by the caller
    Aborted,
}

impl FromStr for CompletionSignal {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "finished" | "complete" | "completed" => Ok(CompletionSignal::Finished),
            "budget_exhausted" | "budget-exhausted" | "partial" => Ok(CompletionSignal::BudgetExhausted),
            "aborted" => Ok(CompletionSignal::Aborted),
            other => Err(format!("unknown completion signal '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    Complete,
    Partial,
    Failed,
}

impl CompletionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionStatus::Complete => "complete",
            CompletionStatus::Partial => "partial",
            CompletionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller supplied facts about the run being assembled
#[derive(Debug, Clone)]
pub struct RunMetadata {
    pub topic: String,
    pub timestamp: DateTime<Utc>,
    pub completion_signal: CompletionSignal,
    /// Records the normalizer produced before validation
    pub normalized_records: usize,
    pub format_warning: Option<FormatWarning>,
}

impl RunMetadata {
    pub fn new(topic: impl Into<String>, timestamp: DateTime<Utc>, completion_signal: CompletionSignal) -> Self {
        Self {
            topic: topic.into(),
            timestamp,
            completion_signal,
            normalized_records: 0,
            format_warning: None,
        }
    }

    pub fn with_normalizer_result(mut self, records: usize, warning: Option<FormatWarning>) -> Self {
        self.normalized_records = records;
        self.format_warning = warning;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(rename = "@type")]
    pub citation_type: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "dateAccessed")]
    pub date_accessed: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyValue {
    #[serde(rename = "@type")]
    pub value_type: String,
    #[serde(rename = "propertyID")]
    pub property_id: String,
    pub value: String,
}

/// One `hasPart` node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEntity {
    #[serde(rename = "@type")]
    pub entity_type: String,
    #[serde(rename = "@id")]
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(flatten)]
    pub properties: BTreeMap<String, Value>,
    pub citation: Vec<Citation>,
    #[serde(rename = "sameAs", default, skip_serializing_if = "Vec::is_empty")]
    pub same_as: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<PropertyValue>,
}

/// The assembled research report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sachstand {
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "@type")]
    pub document_type: String,
    #[serde(rename = "@id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "dateCreated")]
    pub date_created: String,
    #[serde(rename = "hasPart")]
    pub has_part: Vec<DocumentEntity>,
    #[serde(rename = "completionStatus")]
    pub completion_status: CompletionStatus,
    #[serde(rename = "validationMetrics")]
    pub validation_metrics: ValidationMetrics,
}

impl Sachstand {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Hex SHA-256 of the compact serialization
    pub fn digest(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}

/// Builds the Sachstand from canonical entities
#[derive(Debug, Clone, Default)]
pub struct DocumentAssembler;

impl DocumentAssembler {
    pub fn new() -> Self {
        Self
    }

    pub fn completion_status(&self, run: &RunMetadata, canonical_count: usize) -> CompletionStatus {
        if run.normalized_records == 0 && run.format_warning.is_some() {
            return CompletionStatus::Failed;
        }
        match run.completion_signal {
            CompletionSignal::Finished => CompletionStatus::Complete,
            CompletionSignal::BudgetExhausted => CompletionStatus::Partial,
            CompletionSignal::Aborted if canonical_count == 0 => CompletionStatus::Failed,
            CompletionSignal::Aborted => CompletionStatus::Partial,
        }
    }

    pub fn render_entity(&self, entity: &CanonicalEntity, date_accessed: &str) -> DocumentEntity {
        let properties = entity
            .type_specific_properties
            .iter()
            .filter(|(key, value)| {
                !key.starts_with('@')
                    && !RENDERED_KEYS.contains(&key.as_str())
                    && !RESERVED_PROPERTY_KEYS.contains(&key.as_str())
                    && !value.is_null()
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let citation = entity
            .sources
            .iter()
            .map(|source| Citation {
                citation_type: CITATION_TYPE.to_string(),
                url: source.url.clone(),
                name: source.title.clone(),
                date_accessed: date_accessed.to_string(),
            })
            .collect();

        let mut same_as = Vec::new();
        if let Some(q) = &entity.external_ids.wikidata_id {
            same_as.push(format!("{}{}", WIKIDATA_ENTITY_PREFIX, q));
        }
        same_as.extend(entity.external_ids.wikipedia_links.iter().map(|l| l.url.clone()));

        let identifier = entity.external_ids.wikidata_id.as_ref().map(|q| PropertyValue {
            value_type: "PropertyValue".to_string(),
            property_id: "wikidata".to_string(),
            value: q.clone(),
        });

        DocumentEntity {
            entity_type: entity.entity_type.schema_org_type().to_string(),
            id: format!("urn:uuid:{}", entity.id),
            name: entity.name.clone(),
            description: entity.description.clone(),
            properties,
            citation,
            same_as,
            identifier,
        }
    }

    /// Deterministic for a given entity set and run metadata
    pub fn assemble(
        &self,
        entities: &[CanonicalEntity],
        run: &RunMetadata,
        metrics: ValidationMetrics,
    ) -> Sachstand {
        let mut ordered: Vec<&CanonicalEntity> = entities.iter().collect();
        ordered.sort_by(|a, b| {
            a.entity_type
                .cmp(&b.entity_type)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });

        let date_accessed = run.timestamp.format("%Y-%m-%d").to_string();
        let date_created = run.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
        let has_part: Vec<DocumentEntity> = ordered
            .into_iter()
            .map(|entity| self.render_entity(entity, &date_accessed))
            .collect();
        let completion_status = self.completion_status(run, has_part.len());

        let document_key = format!("sachstand:{}:{}", run.topic, date_created);
        let id = format!(
            "urn:uuid:{}",
            Uuid::new_v5(&Uuid::NAMESPACE_URL, document_key.as_bytes())
        );

        info!(
            topic = run.topic.as_str(),
            entities = has_part.len(),
            status = %completion_status,
            "Assembled Sachstand"
        );

        Sachstand {
            context: SCHEMA_ORG_CONTEXT.to_string(),
            document_type: DOCUMENT_TYPE.to_string(),
            id,
            name: run.topic.clone(),
            date_created,
            has_part,
            completion_status,
            validation_metrics: metrics,
        }
    }
}
