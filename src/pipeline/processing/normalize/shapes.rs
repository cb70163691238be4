use serde_json::{Map, Value};
use tracing::debug;

use super::type_names;
use crate::domain::{RawEntityRecord, RawSource};

const NAME_KEYS: &[&str] = &["name", "title", "label"];
const TYPE_KEYS: &[&str] = &["type", "@type", "entity_type", "entityType"];
const SOURCE_KEYS: &[&str] = &["sources", "citations", "references", "citation"];
const SINGLE_SOURCE_KEYS: &[&str] = &["source_url", "sourceUrl", "source"];
const SOURCE_URL_KEYS: &[&str] = &["url", "link", "href"];
/// Wrapper keys some agents put around the actual payload
const WRAPPER_KEYS: &[&str] = &["entities", "results", "hasPart", "data"];

/// The top-level layouts of agent output that carry entities
#[derive(Debug)]
pub enum RawShape<'a> {
    /// `{"Person": [...], "Organization Entities": [...]}`
    GroupedByType(Vec<(String, &'a Value)>),
    /// `[{"type": "Person", ...}, ...]`
    FlatArray(&'a [Value]),
    /// A lone entity object carrying its own type
    SingleEntity(&'a Map<String, Value>),
}

impl<'a> RawShape<'a> {
    /// Detect the shape of an already-parsed JSON value
    pub fn classify(value: &'a Value) -> Option<RawShape<'a>> {
        match value {
            Value::Object(map) => classify_object(map),
            Value::Array(items) if items.iter().all(Value::is_object) => {
                Some(RawShape::FlatArray(items))
            }
            _ => None,
        }
    }

    /// Flatten the shape into raw records. Non-object members are skipped.
    pub fn into_records(self) -> Vec<RawEntityRecord> {
        match self {
            RawShape::GroupedByType(groups) => groups
                .into_iter()
                .flat_map(|(declared_type, members)| {
                    members_of(members)
                        .filter_map(|item| item.as_object())
                        .map(|obj| record_from_object(obj, Some(declared_type.as_str())))
                        .collect::<Vec<_>>()
                })
                .collect(),
            RawShape::FlatArray(items) => items
                .iter()
                .filter_map(|item| {
                    let obj = item.as_object();
                    if obj.is_none() {
                        debug!("Skipping non-object array member");
                    }
                    obj
                })
                .map(|obj| record_from_object(obj, None))
                .collect(),
            RawShape::SingleEntity(obj) => vec![record_from_object(obj, None)],
        }
    }
}

fn classify_object(map: &Map<String, Value>) -> Option<RawShape<'_>> {
    let has_name = NAME_KEYS.iter().any(|k| map.get(*k).map_or(false, Value::is_string));
    let has_type = TYPE_KEYS.iter().any(|k| map.get(*k).map_or(false, Value::is_string));
    let is_entity = has_name && has_type;

    // An entity whose properties happen to be named like a type is still one entity
    let has_type_group = !is_entity
        && map.iter().any(|(key, value)| {
            type_names::lookup(key).is_some() && (is_group_value(value) || is_empty_array(value))
        });

    if has_type_group {
        let groups = map
            .iter()
            .filter(|(key, value)| match value {
                Value::Object(_) => type_names::lookup(key).is_some(),
                other => is_group_value(other),
            })
            .map(|(key, value)| (group_label(key), value))
            .collect();
        return Some(RawShape::GroupedByType(groups));
    }

    for key in WRAPPER_KEYS {
        if let Some(inner) = map.get(*key) {
            if let Some(shape) = RawShape::classify(inner) {
                return Some(shape);
            }
        }
    }

    if is_entity {
        return Some(RawShape::SingleEntity(map));
    }

    None
}

fn is_empty_array(value: &Value) -> bool {
    value.as_array().map_or(false, Vec::is_empty)
}

/// An entity object, or an array holding at least one entity object
fn is_group_value(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(items) => items.iter().any(Value::is_object),
        _ => false,
    }
}

fn members_of(value: &Value) -> Box<dyn Iterator<Item = &Value> + '_> {
    match value {
        Value::Array(items) => Box::new(items.iter()),
        other => Box::new(std::iter::once(other)),
    }
}

/// Canonical type name for a group key, or the key itself when unknown
fn group_label(key: &str) -> String {
    match type_names::lookup(key) {
        Some(entity_type) => entity_type.as_str().to_string(),
        None => key.trim().to_string(),
    }
}

fn first_string<'a>(
    obj: &'a Map<String, Value>,
    keys: &[&'static str],
) -> Option<(&'static str, &'a str)> {
    keys.iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_str).map(|s| (*key, s)))
}

fn record_from_object(obj: &Map<String, Value>, group_type: Option<&str>) -> RawEntityRecord {
    let name_entry = first_string(obj, NAME_KEYS);
    let name = name_entry.map(|(_, s)| s.to_string()).unwrap_or_default();

    // A known group key decides the type; under an unknown key the member's own type wins
    let own_type = first_string(obj, TYPE_KEYS).map(|(_, s)| group_label(s));
    let declared_type = match group_type {
        Some(label) if type_names::lookup(label).is_some() => label.to_string(),
        Some(label) => own_type.unwrap_or_else(|| label.to_string()),
        None => own_type.unwrap_or_default(),
    };

    let mut sources = Vec::new();
    for key in SOURCE_KEYS {
        if let Some(value) = obj.get(*key) {
            sources.extend(sources_from_value(value));
        }
    }
    for key in SINGLE_SOURCE_KEYS {
        if let Some(url) = obj.get(*key).and_then(Value::as_str) {
            sources.push(RawSource::from_url(url));
        }
    }

    let consumed_name_key = name_entry.map(|(key, _)| key);
    let properties = obj
        .iter()
        .filter(|(key, _)| {
            let key = key.as_str();
            Some(key) != consumed_name_key
                && !TYPE_KEYS.contains(&key)
                && !SOURCE_KEYS.contains(&key)
                && !SINGLE_SOURCE_KEYS.contains(&key)
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    RawEntityRecord {
        name,
        declared_type,
        properties,
        sources,
    }
}

fn sources_from_value(value: &Value) -> Vec<RawSource> {
    match value {
        Value::Array(items) => items.iter().filter_map(source_from_item).collect(),
        other => source_from_item(other).into_iter().collect(),
    }
}

fn source_from_item(item: &Value) -> Option<RawSource> {
    match item {
        Value::String(url) => Some(RawSource::from_url(url.as_str())),
        Value::Object(obj) => {
            let url = SOURCE_URL_KEYS
                .iter()
                .find_map(|key| obj.get(*key).and_then(Value::as_str))?;
            Some(RawSource {
                url: url.to_string(),
                title: obj
                    .get("title")
                    .or_else(|| obj.get("name"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                excerpt: obj
                    .get("excerpt")
                    .or_else(|| obj.get("snippet"))
                    .or_else(|| obj.get("quote"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_grouped_shape_accepts_both_key_spellings() {
        let value = json!({
            "Person": [{"name": "Dr. Manfred Lucha", "sources": ["https://sozialministerium.baden-wuerttemberg.de/x"]}],
            "Organization Entities": [{"name": "Caritas BW", "sources": []}]
        });

        let records = RawShape::classify(&value).unwrap().into_records();

        assert_eq!(records.len(), 2);
        let types: Vec<&str> = records.iter().map(|r| r.declared_type.as_str()).collect();
        assert!(types.contains(&"Person"));
        assert!(types.contains(&"Organization"));
    }

    #[test]
    fn test_flat_array_reads_type_field_and_source_objects() {
        let value = json!([
            {
                "type": "Event",
                "title": "Landtagswahl 2026",
                "description": "Wahl zum 18. Landtag",
                "citations": [{"link": "https://www.landtag-bw.de/wahl", "snippet": "Wahl am 8. März"}]
            }
        ]);

        let records = RawShape::classify(&value).unwrap().into_records();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.name, "Landtagswahl 2026");
        assert_eq!(record.declared_type, "Event");
        assert_eq!(record.sources[0].url, "https://www.landtag-bw.de/wahl");
        assert_eq!(record.sources[0].excerpt.as_deref(), Some("Wahl am 8. März"));
        assert!(record.properties.contains_key("description"));
        assert!(!record.properties.contains_key("title"));
        assert!(!record.properties.contains_key("citations"));
    }

    #[test]
    fn test_wrapper_key_is_unwrapped() {
        let value = json!({"entities": [{"type": "Topic", "name": "Pflegereform"}]});

        let records = RawShape::classify(&value).unwrap().into_records();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].declared_type, "Topic");
    }

    #[test]
    fn test_unknown_group_key_keeps_its_label() {
        let value = json!({
            "Person": [],
            "Location": [{"name": "Stuttgart"}]
        });

        let records = RawShape::classify(&value).unwrap().into_records();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].declared_type, "Location");
    }

    #[test]
    fn test_plain_object_is_not_a_shape() {
        assert!(RawShape::classify(&json!({"status": "done"})).is_none());
        assert!(RawShape::classify(&json!(["a", "b"])).is_none());
        assert!(RawShape::classify(&json!(42)).is_none());
    }

    #[test]
    fn test_entity_with_list_property_named_like_a_type() {
        let value = json!({
            "type": "Person",
            "name": "Manfred Lucha",
            "events": ["Landtagswahl 2021"],
            "topics": [],
            "organizations": [{"name": "Bündnis 90/Die Grünen"}],
            "sources": [{"url": "https://www.landtag-bw.de/lucha"}]
        });

        let records = RawShape::classify(&value).unwrap().into_records();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Manfred Lucha");
        assert_eq!(records[0].declared_type, "Person");
        assert_eq!(records[0].sources.len(), 1);
        assert!(records[0].properties.contains_key("events"));
    }

    #[test]
    fn test_wrapper_with_scalar_type_list_sibling() {
        let value = json!({
            "entities": [{"type": "Person", "name": "Manfred Lucha",
                          "sources": ["https://www.landtag-bw.de/lucha"]}],
            "topics": ["Pflegereform"]
        });

        let records = RawShape::classify(&value).unwrap().into_records();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].declared_type, "Person");
    }

    #[test]
    fn test_member_type_wins_under_unknown_group_key() {
        let value = json!({
            "Person": [{"name": "Manfred Lucha"}],
            "Weitere": [{"type": "Organisation", "name": "Caritas BW"}, {"name": "Stuttgart"}]
        });

        let records = RawShape::classify(&value).unwrap().into_records();

        let types: Vec<(&str, &str)> = records
            .iter()
            .map(|r| (r.name.as_str(), r.declared_type.as_str()))
            .collect();
        assert!(types.contains(&("Manfred Lucha", "Person")));
        assert!(types.contains(&("Caritas BW", "Organization")));
        assert!(types.contains(&("Stuttgart", "Weitere")));
    }
}
