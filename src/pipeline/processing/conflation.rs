//! Entity resolution: merges validated entities that refer to the same
//! real-world referent, by Wikidata id first and normalized name second.

use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{CanonicalEntity, EntityType, ValidatedEntity, RESERVED_PROPERTY_KEYS};
use crate::pipeline::processing::quality_gate::{is_dedup_candidate, EntityValidator, QualityGate};

/// Canonical entities plus the number of merges each phase performed
#[derive(Debug, Clone, PartialEq)]
pub struct DeduplicationOutcome {
    pub entities: Vec<CanonicalEntity>,
    /// Groups of two or more entities merged on a shared Wikidata id
    pub dedup_by_identifier: usize,
    /// Groups merged on type and normalized name
    pub dedup_by_name: usize,
}

/// Trait for entity resolution over one run's entities
pub trait Conflator {
    /// Merge valid entities; rejected ones are skipped
    fn deduplicate(&self, entities: &[ValidatedEntity]) -> DeduplicationOutcome;

    /// Same resolution over entities that are already canonical
    fn deduplicate_canonical(&self, entities: Vec<CanonicalEntity>) -> DeduplicationOutcome;
}

/// Lowercased, trimmed name with inner whitespace collapsed
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Stable id for entities resolved through Wikidata
pub fn identifier_entity_id(entity_type: EntityType, wikidata_id: &str) -> String {
    let key = format!("sachstand:{}:wikidata:{}", entity_type.as_str(), wikidata_id);
    Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes()).to_string()
}

/// Stable id for entities resolved by name alone
pub fn name_entity_id(entity_type: EntityType, name: &str) -> String {
    let key = format!("sachstand:{}:name:{}", entity_type.as_str(), normalize_name(name));
    Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes()).to_string()
}

fn assign_id(entity: &mut CanonicalEntity) {
    entity.id = match &entity.external_ids.wikidata_id {
        Some(q) => identifier_entity_id(entity.entity_type, q),
        None => name_entity_id(entity.entity_type, &entity.name),
    };
}

/// Singleton canonical form of one valid entity
pub fn seed_canonical(entity: &ValidatedEntity, entity_type: EntityType) -> CanonicalEntity {
    let type_specific_properties: Map<String, Value> = entity
        .record
        .properties
        .iter()
        .filter(|(key, _)| !RESERVED_PROPERTY_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let mut canonical = CanonicalEntity {
        id: String::new(),
        entity_type,
        name: entity.name().to_string(),
        description: entity.record.description().unwrap_or_default().to_string(),
        type_specific_properties,
        sources: entity.sources.clone(),
        external_ids: entity.external_ids.clone(),
        quality_score: entity.quality_score,
    };
    assign_id(&mut canonical);
    canonical
}

/// Best member first: score, then source count, then name
fn rank(a: &CanonicalEntity, b: &CanonicalEntity) -> Ordering {
    b.quality_score
        .total_cmp(&a.quality_score)
        .then_with(|| b.sources.len().cmp(&a.sources.len()))
        .then_with(|| a.name.cmp(&b.name))
}

/// Default two-phase deduplicator
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    gate: EntityValidator,
}

impl Deduplicator {
    pub fn new(gate: EntityValidator) -> Self {
        Self { gate }
    }

    /// Fold a group into one entity. Groups of one come back unchanged apart from the id.
    fn merge(&self, mut group: Vec<CanonicalEntity>) -> Option<CanonicalEntity> {
        group.sort_by(rank);
        let mut members = group.into_iter();
        let mut merged = members.next()?;
        let base_score = merged.quality_score;
        let mut absorbed = 0;

        for member in members {
            absorbed += 1;
            let mut seen: HashSet<String> = merged.sources.iter().map(|s| s.url.clone()).collect();
            for source in member.sources {
                if seen.insert(source.url.clone()) {
                    merged.sources.push(source);
                }
            }
            if member.description.trim().chars().count() > merged.description.trim().chars().count() {
                merged.description = member.description;
            }
            for (key, value) in member.type_specific_properties {
                let missing = !crate::domain::property_is_set(&merged.type_specific_properties, &key);
                if missing && !value.is_null() {
                    merged.type_specific_properties.insert(key, value);
                }
            }
            merged.external_ids.absorb(&member.external_ids);
        }

        if absorbed > 0 {
            merged.quality_score = self.gate.score_canonical(&merged).max(base_score);
        }
        assign_id(&mut merged);
        Some(merged)
    }

    /// Give each Wikidata id to a single type. The type of the best ranked
    /// holder keeps it; other types lose the id and fall back to name matching.
    fn resolve_identifier_owners(&self, entities: &mut [CanonicalEntity]) {
        let mut owners: HashMap<String, &CanonicalEntity> = HashMap::new();
        for entity in entities.iter() {
            if let Some(q) = &entity.external_ids.wikidata_id {
                let replace = owners
                    .get(q)
                    .map(|current| rank(entity, current) == Ordering::Less)
                    .unwrap_or(true);
                if replace {
                    owners.insert(q.clone(), entity);
                }
            }
        }
        let owner_types: HashMap<String, EntityType> = owners
            .into_iter()
            .map(|(q, entity)| (q, entity.entity_type))
            .collect();

        for entity in entities.iter_mut() {
            let conflicting = entity
                .external_ids
                .wikidata_id
                .as_ref()
                .and_then(|q| owner_types.get(q))
                .map(|owner| *owner != entity.entity_type)
                .unwrap_or(false);
            if conflicting {
                debug!(
                    name = entity.name.as_str(),
                    entity_type = entity.entity_type.as_str(),
                    wikidata_id = ?entity.external_ids.wikidata_id,
                    "Wikidata id claimed by another type, matching by name instead"
                );
                entity.external_ids.wikidata_id = None;
                assign_id(entity);
            }
        }
    }
}

impl Conflator for Deduplicator {
    fn deduplicate(&self, entities: &[ValidatedEntity]) -> DeduplicationOutcome {
        let seeds = entities
            .iter()
            .filter_map(|entity| is_dedup_candidate(entity).map(|t| seed_canonical(entity, t)))
            .collect();
        self.deduplicate_canonical(seeds)
    }

    fn deduplicate_canonical(&self, mut entities: Vec<CanonicalEntity>) -> DeduplicationOutcome {
        let input_count = entities.len();
        self.resolve_identifier_owners(&mut entities);

        // Identifier phase; groups keep first-appearance order
        let mut identifier_groups: Vec<Vec<CanonicalEntity>> = Vec::new();
        let mut identifier_index: HashMap<(EntityType, String), usize> = HashMap::new();
        let mut unresolved = Vec::new();
        for entity in entities {
            match entity.external_ids.wikidata_id.clone() {
                Some(q) => {
                    let key = (entity.entity_type, q);
                    match identifier_index.get(&key) {
                        Some(&i) => identifier_groups[i].push(entity),
                        None => {
                            identifier_index.insert(key, identifier_groups.len());
                            identifier_groups.push(vec![entity]);
                        }
                    }
                }
                None => unresolved.push(entity),
            }
        }

        let dedup_by_identifier = identifier_groups.iter().filter(|g| g.len() > 1).count();
        let mut resolved: Vec<CanonicalEntity> = identifier_groups
            .into_iter()
            .filter_map(|group| self.merge(group))
            .collect();

        // Name phase over everything the identifier phase left alone
        let mut name_groups: Vec<Vec<CanonicalEntity>> = Vec::new();
        let mut name_index: HashMap<(EntityType, String), usize> = HashMap::new();
        for entity in unresolved {
            let key = (entity.entity_type, normalize_name(&entity.name));
            match name_index.get(&key) {
                Some(&i) => name_groups[i].push(entity),
                None => {
                    name_index.insert(key, name_groups.len());
                    name_groups.push(vec![entity]);
                }
            }
        }

        let mut dedup_by_name = 0;
        let mut standalone = Vec::new();
        for group in name_groups {
            let (entity_type, normalized) = match group.first() {
                Some(first) => (first.entity_type, normalize_name(&first.name)),
                None => continue,
            };
            let matches: Vec<usize> = resolved
                .iter()
                .enumerate()
                .filter(|(_, r)| r.entity_type == entity_type && normalize_name(&r.name) == normalized)
                .map(|(i, _)| i)
                .collect();

            if let [target] = matches.as_slice() {
                // Exactly one identified entity carries this name: attach to it
                let target = *target;
                let mut combined = vec![resolved[target].clone()];
                combined.extend(group);
                if let Some(merged) = self.merge(combined) {
                    resolved[target] = merged;
                    dedup_by_name += 1;
                }
                continue;
            }

            if group.len() > 1 {
                dedup_by_name += 1;
            }
            standalone.extend(self.merge(group));
        }

        resolved.extend(standalone);

        info!(
            input = input_count,
            output = resolved.len(),
            dedup_by_identifier,
            dedup_by_name,
            "Deduplication completed"
        );

        DeduplicationOutcome {
            entities: resolved,
            dedup_by_identifier,
            dedup_by_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RawEntityRecord, RawSource};
    use serde_json::json;

    fn validated(name: &str, declared_type: &str, props: Value, urls: &[&str]) -> ValidatedEntity {
        let record = RawEntityRecord {
            name: name.to_string(),
            declared_type: declared_type.to_string(),
            properties: props.as_object().cloned().unwrap_or_default(),
            sources: urls.iter().map(|u| RawSource::from_url(*u)).collect(),
        };
        EntityValidator::default().assess_unchecked(&record)
    }

    fn dedup(entities: &[ValidatedEntity]) -> DeduplicationOutcome {
        Deduplicator::default().deduplicate(entities)
    }

    #[test]
    fn test_name_variants_merge_with_both_sources() {
        let outcome = dedup(&[
            validated("Caritas BW", "Organization", json!({}), &["https://www.caritas-bw.de/a"]),
            validated("caritas bw ", "Organization", json!({}), &["https://www.caritas-bw.de/b"]),
        ]);

        assert_eq!(outcome.entities.len(), 1);
        assert_eq!(outcome.entities[0].sources.len(), 2);
        assert_eq!(outcome.dedup_by_name, 1);
        assert_eq!(outcome.dedup_by_identifier, 0);
    }

    #[test]
    fn test_shared_wikidata_id_merges_in_identifier_phase() {
        let outcome = dedup(&[
            validated(
                "M. Lucha",
                "Person",
                json!({"wikidata_id": "Q1889089", "description": "Sozialminister BW"}),
                &["https://www.landtag-bw.de/lucha"],
            ),
            validated(
                "Manfred Lucha",
                "Person",
                json!({"wikidata_id": "Q1889089", "jobTitle": "Minister"}),
                &["https://sozialministerium.baden-wuerttemberg.de/x"],
            ),
        ]);

        assert_eq!(outcome.entities.len(), 1);
        assert_eq!(outcome.dedup_by_identifier, 1);
        assert_eq!(outcome.dedup_by_name, 0);
        let merged = &outcome.entities[0];
        assert_eq!(merged.external_ids.wikidata_id.as_deref(), Some("Q1889089"));
        assert_eq!(merged.sources.len(), 2);
        assert_eq!(merged.type_specific_properties.get("jobTitle"), Some(&json!("Minister")));
        assert_eq!(merged.id, identifier_entity_id(EntityType::Person, "Q1889089"));
    }

    #[test]
    fn test_types_never_cross_merge() {
        let outcome = dedup(&[
            validated("Pflegereform", "Topic", json!({}), &["https://www.bundestag.de/a"]),
            validated("Pflegereform", "Policy", json!({}), &["https://www.bundestag.de/b"]),
        ]);

        assert_eq!(outcome.entities.len(), 2);
        assert_eq!(outcome.dedup_by_name, 0);
    }

    #[test]
    fn test_wikidata_id_stays_with_one_type() {
        let outcome = dedup(&[
            validated(
                "Caritas BW",
                "Organization",
                json!({"wikidata_id": "Q1035962", "description": "Wohlfahrtsverband in Baden-Württemberg"}),
                &["https://www.caritas-bw.de/"],
            ),
            validated("Caritas BW", "Topic", json!({"wikidata_id": "Q1035962"}), &["https://www.caritas-bw.de/t"]),
        ]);

        let with_id: Vec<_> = outcome
            .entities
            .iter()
            .filter(|e| e.external_ids.wikidata_id.is_some())
            .collect();
        assert_eq!(outcome.entities.len(), 2);
        assert_eq!(with_id.len(), 1);
        assert_eq!(with_id[0].entity_type, EntityType::Organization);
    }

    #[test]
    fn test_unidentified_name_attaches_to_identified_entity() {
        let outcome = dedup(&[
            validated("Manfred Lucha", "Person", json!({"wikidata_id": "Q1889089"}), &["https://www.landtag-bw.de/lucha"]),
            validated("manfred  lucha", "Person", json!({}), &["https://www.stuttgarter-zeitung.de/lucha"]),
        ]);

        assert_eq!(outcome.entities.len(), 1);
        assert_eq!(outcome.dedup_by_name, 1);
        assert_eq!(outcome.entities[0].sources.len(), 2);
    }

    #[test]
    fn test_second_pass_is_a_no_op() {
        let deduplicator = Deduplicator::default();
        let first = deduplicator.deduplicate(&[
            validated("Caritas BW", "Organization", json!({}), &["https://www.caritas-bw.de/a"]),
            validated("CARITAS BW", "Organization", json!({"website": "https://www.caritas-bw.de"}), &["https://www.caritas-bw.de/b"]),
            validated("M. Lucha", "Person", json!({"wikidata_id": "Q1889089"}), &["https://www.landtag-bw.de/lucha"]),
            validated("Manfred Lucha", "Person", json!({"wikidata_id": "Q1889089"}), &["https://www.bund.de/lucha"]),
            validated("Manfred Lucha", "Topic", json!({"wikidata_id": "Q1889089"}), &["https://www.bund.de/topic"]),
        ]);

        let second = deduplicator.deduplicate_canonical(first.entities.clone());

        assert_eq!(second.entities, first.entities);
        assert_eq!(second.dedup_by_identifier, 0);
        assert_eq!(second.dedup_by_name, 0);
    }

    #[test]
    fn test_merge_keeps_every_source_and_never_lowers_score() {
        let a = validated(
            "Pflegestärkungsgesetz",
            "Policy",
            json!({"description": "Gesetz zur Stärkung der Pflege"}),
            &["https://www.bundesgesundheitsministerium.de/a", "https://www.bundestag.de/p"],
        );
        let b = validated("pflegestärkungsgesetz", "Policy", json!({}), &["https://www.bundestag.de/p", "https://www.aerzteblatt.de/p"]);
        let best_input = a.quality_score.max(b.quality_score);

        let outcome = dedup(&[a, b]);

        let merged = &outcome.entities[0];
        assert_eq!(merged.sources.len(), 3);
        assert!(merged.quality_score >= best_input);
        assert_eq!(merged.description, "Gesetz zur Stärkung der Pflege");
    }

    #[test]
    fn test_rejected_entities_are_skipped() {
        let outcome = dedup(&[validated("Jane Placeholder", "Person", json!({}), &["https://example.com/a"])]);
        assert!(outcome.entities.is_empty());
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Caritas   BW "), "caritas bw");
        assert_eq!(normalize_name("caritas bw"), normalize_name("Caritas BW"));
    }

    #[test]
    fn test_equal_rank_falls_back_to_lexical_name() {
        let lower = validated("caritas bw", "Organization", json!({}), &["https://www.caritas-bw.de/a"]);
        let upper = validated("Caritas BW", "Organization", json!({}), &["https://www.caritas-bw.de/b"]);
        assert_eq!(lower.quality_score, upper.quality_score);

        let forward = dedup(&[lower.clone(), upper.clone()]);
        let backward = dedup(&[upper, lower]);

        assert_eq!(forward.entities.len(), 1);
        assert_eq!(backward.entities.len(), 1);
        assert_eq!(forward.entities[0].name, "Caritas BW");
        assert_eq!(backward.entities[0].name, "Caritas BW");
        assert_eq!(forward.entities[0].id, backward.entities[0].id);
        assert_eq!(forward.entities[0].sources.len(), 2);
    }
}
