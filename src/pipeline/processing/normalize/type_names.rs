use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::domain::EntityType;

/// Every spelling agents have been seen to use for an entity type.
/// Keys are lowercase with single spaces.
const TYPE_SPELLINGS: &[(&str, EntityType)] = &[
    ("person", EntityType::Person),
    ("persons", EntityType::Person),
    ("people", EntityType::Person),
    ("person entities", EntityType::Person),
    ("persons entities", EntityType::Person),
    ("people entities", EntityType::Person),
    ("personen", EntityType::Person),
    ("organization", EntityType::Organization),
    ("organizations", EntityType::Organization),
    ("organisation", EntityType::Organization),
    ("organisations", EntityType::Organization),
    ("organization entities", EntityType::Organization),
    ("organisation entities", EntityType::Organization),
    ("organisationen", EntityType::Organization),
    ("event", EntityType::Event),
    ("events", EntityType::Event),
    ("event entities", EntityType::Event),
    ("ereignis", EntityType::Event),
    ("ereignisse", EntityType::Event),
    ("veranstaltungen", EntityType::Event),
    ("topic", EntityType::Topic),
    ("topics", EntityType::Topic),
    ("topic entities", EntityType::Topic),
    ("thema", EntityType::Topic),
    ("themen", EntityType::Topic),
    ("policy", EntityType::Policy),
    ("policies", EntityType::Policy),
    ("policy entities", EntityType::Policy),
    ("legislation", EntityType::Policy),
    ("gesetz", EntityType::Policy),
    ("gesetze", EntityType::Policy),
];

static TYPE_TABLE: Lazy<HashMap<&'static str, EntityType>> =
    Lazy::new(|| TYPE_SPELLINGS.iter().copied().collect());

/// Resolve a declared type name to its canonical type
pub fn lookup(raw: &str) -> Option<EntityType> {
    let key = raw.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    TYPE_TABLE.get(key.as_str()).copied()
}
