pub mod external_ids;
pub mod url_rules;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

use crate::constants::{
    DEFAULT_AUTHORITATIVE_HOST_SUFFIXES, DEFAULT_BLACKLIST_PATTERNS, DEFAULT_MIN_DESCRIPTION_CHARS,
    DEFAULT_MIN_NAME_CHARS, DEFAULT_OFFICIAL_HOSTS, DEFAULT_REJECTION_THRESHOLD,
};
use crate::domain::{
    property_is_set, CanonicalEntity, EntitySource, EntityType, RawEntityRecord,
    UrlVerification, ValidatedEntity, ValidationIssue, ValidationStatus,
};
use crate::error::{PipelineError, Result};
use crate::pipeline::processing::normalize::type_names;
use url_rules::{parse_source_url, SourcePatterns};

/// Live check results keyed by trimmed source URL
pub type UrlChecks = HashMap<String, UrlVerification>;

/// Weight each satisfied signal contributes to the quality score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub valid_name: f64,
    pub description: f64,
    pub valid_source: f64,
    pub authoritative_source: f64,
    pub type_property: f64,
    pub reference_link: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            valid_name: 0.2,
            description: 0.2,
            valid_source: 0.2,
            authoritative_source: 0.2,
            type_property: 0.1,
            reference_link: 0.1,
        }
    }
}

/// Configuration for the entity validator. Immutable once the validator is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub blacklist_patterns: Vec<String>,
    pub authoritative_host_suffixes: Vec<String>,
    pub official_hosts: Vec<String>,
    pub weights: ScoreWeights,
    /// Entities scoring below this are rejected
    pub rejection_threshold: f64,
    pub min_name_chars: usize,
    pub min_description_chars: usize,
    pub rule_version: String,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            blacklist_patterns: owned(DEFAULT_BLACKLIST_PATTERNS),
            authoritative_host_suffixes: owned(DEFAULT_AUTHORITATIVE_HOST_SUFFIXES),
            official_hosts: owned(DEFAULT_OFFICIAL_HOSTS),
            weights: ScoreWeights::default(),
            rejection_threshold: DEFAULT_REJECTION_THRESHOLD,
            min_name_chars: DEFAULT_MIN_NAME_CHARS,
            min_description_chars: DEFAULT_MIN_DESCRIPTION_CHARS,
            rule_version: "v1.0.0".to_string(),
        }
    }
}

impl ValidatorConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.rejection_threshold) {
            return Err(PipelineError::Config(format!(
                "rejection_threshold must be within [0, 1], got {}",
                self.rejection_threshold
            )));
        }
        let w = &self.weights;
        let weights = [
            w.valid_name,
            w.description,
            w.valid_source,
            w.authoritative_source,
            w.type_property,
            w.reference_link,
        ];
        if weights.iter().any(|weight| *weight < 0.0 || !weight.is_finite()) {
            return Err(PipelineError::Config(
                "score weights must be finite and non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which scoring signals an entity satisfies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreSignals {
    pub valid_name: bool,
    pub description: bool,
    pub valid_source: bool,
    pub authoritative_source: bool,
    pub type_property: bool,
    pub reference_link: bool,
}

impl ScoreWeights {
    /// Weighted sum of satisfied signals, clamped to [0, 1]
    pub fn score(&self, signals: &ScoreSignals) -> f64 {
        let parts = [
            (signals.valid_name, self.valid_name),
            (signals.description, self.description),
            (signals.valid_source, self.valid_source),
            (signals.authoritative_source, self.authoritative_source),
            (signals.type_property, self.type_property),
            (signals.reference_link, self.reference_link),
        ];
        let total: f64 = parts.iter().filter(|(hit, _)| *hit).map(|(_, w)| w).sum();
        total.clamp(0.0, 1.0)
    }
}

/// Trait for the entity quality gate
pub trait QualityGate {
    /// Check one raw record. Rejection is a status, never an error.
    fn assess(&self, record: &RawEntityRecord, url_checks: &UrlChecks) -> ValidatedEntity;

    /// Re-run the scoring formula over an already merged entity
    fn score_canonical(&self, entity: &CanonicalEntity) -> f64;
}

/// Default quality gate implementing the structural, credibility and score checks
#[derive(Debug, Clone)]
pub struct EntityValidator {
    config: ValidatorConfig,
    patterns: SourcePatterns,
}

impl EntityValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        let patterns = SourcePatterns::new(
            &config.blacklist_patterns,
            &config.authoritative_host_suffixes,
            &config.official_hosts,
        );
        Self { config, patterns }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn patterns(&self) -> &SourcePatterns {
        &self.patterns
    }

    /// Assess without live URL checks
    pub fn assess_unchecked(&self, record: &RawEntityRecord) -> ValidatedEntity {
        self.assess(record, &UrlChecks::new())
    }

    fn name_is_valid(&self, name: &str) -> bool {
        name.trim().chars().count() >= self.config.min_name_chars
    }

    fn description_is_sufficient(&self, description: Option<&str>) -> bool {
        description
            .map(|d| d.trim().chars().count() >= self.config.min_description_chars)
            .unwrap_or(false)
    }

    fn any_authoritative(&self, sources: &[EntitySource]) -> bool {
        sources.iter().any(|source| {
            parse_source_url(&source.url)
                .map(|url| self.patterns.is_authoritative(&url))
                .unwrap_or(false)
        })
    }

    /// Run syntax, blacklist and accessibility checks over the claimed sources
    fn screen_sources(
        &self,
        record: &RawEntityRecord,
        url_checks: &UrlChecks,
        findings: &mut BTreeSet<ValidationIssue>,
    ) -> Vec<EntitySource> {
        let mut accepted = Vec::new();
        let mut unreachable = Vec::new();
        let mut seen = HashSet::new();

        for source in &record.sources {
            let url = source.url.trim();
            if let Err(e) = parse_source_url(url) {
                debug!(url, error = %e, "Source failed URL syntax check");
                findings.insert(ValidationIssue::InvalidUrl);
                continue;
            }
            if let Some(pattern) = self.patterns.blacklist_match(url) {
                debug!(url, pattern, "Source matches blacklist pattern");
                findings.insert(ValidationIssue::BlacklistedSource);
                continue;
            }
            if !seen.insert(url.to_string()) {
                continue;
            }
            match url_checks.get(url).copied().unwrap_or(UrlVerification::NotChecked) {
                UrlVerification::Unreachable => unreachable.push(source),
                status => accepted.push(EntitySource::from_raw(source, status)),
            }
        }

        if !unreachable.is_empty() {
            findings.insert(ValidationIssue::UnreachableSource);
            // A dead link alone never costs an entity its last citation
            if accepted.is_empty() {
                accepted.extend(
                    unreachable
                        .into_iter()
                        .map(|s| EntitySource::from_raw(s, UrlVerification::Unverified)),
                );
            }
        }

        accepted
    }
}

impl Default for EntityValidator {
    fn default() -> Self {
        Self::new(ValidatorConfig::default())
    }
}

impl QualityGate for EntityValidator {
    fn assess(&self, record: &RawEntityRecord, url_checks: &UrlChecks) -> ValidatedEntity {
        let mut findings = BTreeSet::new();
        let mut hard_reject = false;

        let name_ok = self.name_is_valid(&record.name);
        if !name_ok {
            findings.insert(ValidationIssue::NameTooShort);
            hard_reject = true;
        }

        let entity_type = type_names::lookup(&record.declared_type);
        if entity_type.is_none() {
            findings.insert(ValidationIssue::UnknownType);
            hard_reject = true;
        }

        let sources = if record.sources.is_empty() {
            findings.insert(ValidationIssue::NoSources);
            hard_reject = true;
            Vec::new()
        } else {
            let accepted = self.screen_sources(record, url_checks, &mut findings);
            if accepted.is_empty() {
                findings.insert(ValidationIssue::AllSourcesInvalid);
                hard_reject = true;
            }
            accepted
        };

        let description = record.description();
        match description {
            None => {
                findings.insert(ValidationIssue::MissingDescription);
            }
            Some(_) if !self.description_is_sufficient(description) => {
                findings.insert(ValidationIssue::ShortDescription);
            }
            Some(_) => {}
        }

        let external_ids = external_ids::extract(&record.properties, &sources);
        let has_authoritative_source = self.any_authoritative(&sources);
        let type_property = entity_type
            .map(|t| {
                t.required_property_keys()
                    .iter()
                    .any(|key| property_is_set(&record.properties, key))
            })
            .unwrap_or(false);

        let signals = ScoreSignals {
            valid_name: name_ok,
            description: self.description_is_sufficient(description),
            valid_source: !sources.is_empty(),
            authoritative_source: has_authoritative_source,
            type_property,
            reference_link: external_ids.has_reference_link(),
        };
        let quality_score = self.config.weights.score(&signals);

        if !hard_reject && quality_score < self.config.rejection_threshold {
            findings.insert(ValidationIssue::LowQualityScore);
            hard_reject = true;
        }

        let findings: Vec<ValidationIssue> = findings.into_iter().collect();
        let (validation_status, rejection_reasons, warnings, sources) = if hard_reject {
            debug!(
                name = record.name.as_str(),
                reasons = ?findings,
                score = quality_score,
                "Entity rejected"
            );
            (ValidationStatus::Rejected, findings, Vec::new(), Vec::new())
        } else {
            (ValidationStatus::Valid, Vec::new(), findings, sources)
        };

        ValidatedEntity {
            record: record.clone(),
            entity_type,
            sources,
            external_ids,
            quality_score,
            validation_status,
            rejection_reasons,
            warnings,
            has_authoritative_source,
        }
    }

    fn score_canonical(&self, entity: &CanonicalEntity) -> f64 {
        let description = Some(entity.description.as_str()).filter(|d| !d.trim().is_empty());
        let signals = ScoreSignals {
            valid_name: self.name_is_valid(&entity.name),
            description: self.description_is_sufficient(description),
            valid_source: !entity.sources.is_empty(),
            authoritative_source: self.any_authoritative(&entity.sources),
            type_property: entity.has_required_property(),
            reference_link: entity.external_ids.has_reference_link(),
        };
        self.config.weights.score(&signals)
    }
}

/// Whether a validated entity can enter deduplication
pub fn is_dedup_candidate(entity: &ValidatedEntity) -> Option<EntityType> {
    if entity.is_valid() {
        entity.entity_type
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawSource;
    use serde_json::{json, Map, Value};

    fn record(name: &str, declared_type: &str, properties: Value, urls: &[&str]) -> RawEntityRecord {
        RawEntityRecord {
            name: name.to_string(),
            declared_type: declared_type.to_string(),
            properties: properties.as_object().cloned().unwrap_or_else(Map::new),
            sources: urls.iter().map(|u| RawSource::from_url(*u)).collect(),
        }
    }

    #[test]
    fn test_ministerial_person_scores_high() {
        let validator = EntityValidator::default();
        let raw = record(
            "Dr. Manfred Lucha",
            "Person",
            json!({"description": "Minister für Soziales, Gesundheit und Integration", "jobTitle": "Minister"}),
            &["https://sozialministerium.baden-wuerttemberg.de/x"],
        );

        let validated = validator.assess_unchecked(&raw);

        assert!(validated.is_valid());
        assert!(validated.has_authoritative_source);
        assert!((validated.quality_score - 0.9).abs() < 1e-9);
        assert_eq!(validated.entity_type, Some(EntityType::Person));
    }

    #[test]
    fn test_blacklisted_only_source_rejects() {
        let validator = EntityValidator::default();
        let raw = record(
            "Jane Placeholder",
            "Person",
            json!({"description": "Some person of interest"}),
            &["https://example.com/a"],
        );

        let validated = validator.assess_unchecked(&raw);

        assert_eq!(validated.validation_status, ValidationStatus::Rejected);
        assert!(validated.rejection_reasons.contains(&ValidationIssue::BlacklistedSource));
        assert!(validated.rejection_reasons.contains(&ValidationIssue::AllSourcesInvalid));
        assert!(validated.sources.is_empty());
    }

    #[test]
    fn test_blacklisted_source_dropped_from_valid_entity() {
        let validator = EntityValidator::default();
        let raw = record(
            "Caritas BW",
            "Organization",
            json!({"description": "Wohlfahrtsverband in Baden-Württemberg"}),
            &["https://www.caritas-bw.de/", "https://fake-news.net/caritas"],
        );

        let validated = validator.assess_unchecked(&raw);

        assert!(validated.is_valid());
        assert_eq!(validated.sources.len(), 1);
        assert!(validated.warnings.contains(&ValidationIssue::BlacklistedSource));
    }

    #[test]
    fn test_structural_failures_reject() {
        let validator = EntityValidator::default();

        let short = validator.assess_unchecked(&record("X", "Person", json!({}), &["https://www.bund.de/"]));
        assert!(short.rejection_reasons.contains(&ValidationIssue::NameTooShort));

        let unknown = validator.assess_unchecked(&record("Stuttgart", "Location", json!({}), &["https://www.stuttgart.de/"]));
        assert!(unknown.rejection_reasons.contains(&ValidationIssue::UnknownType));
        assert_eq!(unknown.entity_type, None);

        let unsourced = validator.assess_unchecked(&record("Caritas BW", "Organization", json!({}), &[]));
        assert!(unsourced.rejection_reasons.contains(&ValidationIssue::NoSources));

        let broken = validator.assess_unchecked(&record("Caritas BW", "Organization", json!({}), &["ftp://caritas-bw.de"]));
        assert!(broken.rejection_reasons.contains(&ValidationIssue::InvalidUrl));
    }

    #[test]
    fn test_missing_description_is_penalized_not_rejected() {
        let validator = EntityValidator::default();
        let raw = record("Caritas BW", "Organization", json!({}), &["https://www.caritas-bw.de/"]);

        let validated = validator.assess_unchecked(&raw);

        assert!(validated.is_valid());
        assert!(validated.warnings.contains(&ValidationIssue::MissingDescription));
        assert!((validated.quality_score - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_rejects_low_scores() {
        let config = ValidatorConfig {
            rejection_threshold: 0.5,
            ..ValidatorConfig::default()
        };
        let validator = EntityValidator::new(config);
        let raw = record("Caritas BW", "Organization", json!({"description": "kurz"}), &["https://www.caritas-bw.de/"]);

        let validated = validator.assess_unchecked(&raw);

        assert_eq!(validated.validation_status, ValidationStatus::Rejected);
        assert!(validated.rejection_reasons.contains(&ValidationIssue::ShortDescription));
        assert!(validated.rejection_reasons.contains(&ValidationIssue::LowQualityScore));
    }

    #[test]
    fn test_reference_link_and_type_property_bonus() {
        let validator = EntityValidator::default();
        let raw = record(
            "Caritas BW",
            "Organization",
            json!({
                "description": "Wohlfahrtsverband in Baden-Württemberg",
                "website": "https://www.caritas-bw.de",
                "wikidata_id": "Q1035962"
            }),
            &["https://www.caritas-bw.de/"],
        );

        let validated = validator.assess_unchecked(&raw);

        assert_eq!(validated.external_ids.wikidata_id.as_deref(), Some("Q1035962"));
        assert!((validated.quality_score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_unreachable_source_degrades_when_it_is_the_last_one() {
        let validator = EntityValidator::default();
        let raw = record(
            "Caritas BW",
            "Organization",
            json!({"description": "Wohlfahrtsverband in Baden-Württemberg"}),
            &["https://www.caritas-bw.de/alt"],
        );
        let mut checks = UrlChecks::new();
        checks.insert("https://www.caritas-bw.de/alt".to_string(), UrlVerification::Unreachable);

        let validated = validator.assess(&raw, &checks);

        assert!(validated.is_valid());
        assert_eq!(validated.sources[0].verification, UrlVerification::Unverified);
        assert!(validated.warnings.contains(&ValidationIssue::UnreachableSource));
    }

    #[test]
    fn test_unreachable_source_dropped_when_others_remain() {
        let validator = EntityValidator::default();
        let raw = record(
            "Caritas BW",
            "Organization",
            json!({"description": "Wohlfahrtsverband in Baden-Württemberg"}),
            &["https://www.caritas-bw.de/alt", "https://www.caritas-bw.de/neu"],
        );
        let mut checks = UrlChecks::new();
        checks.insert("https://www.caritas-bw.de/alt".to_string(), UrlVerification::Unreachable);
        checks.insert("https://www.caritas-bw.de/neu".to_string(), UrlVerification::Accessible);

        let validated = validator.assess(&raw, &checks);

        assert_eq!(validated.sources.len(), 1);
        assert_eq!(validated.sources[0].verification, UrlVerification::Accessible);
    }

    #[test]
    fn test_score_weights_clamp() {
        let weights = ScoreWeights {
            valid_name: 0.9,
            description: 0.9,
            ..ScoreWeights::default()
        };
        let signals = ScoreSignals {
            valid_name: true,
            description: true,
            ..ScoreSignals::default()
        };
        assert_eq!(weights.score(&signals), 1.0);
        assert_eq!(weights.score(&ScoreSignals::default()), 0.0);
    }

    #[test]
    fn test_config_validation() {
        assert!(ValidatorConfig::default().validate().is_ok());
        let bad = ValidatorConfig {
            rejection_threshold: 1.5,
            ..ValidatorConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
