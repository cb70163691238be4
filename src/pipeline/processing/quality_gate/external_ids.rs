//! Wikidata and Wikipedia identifiers found in entity properties and sources.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::url_rules::parse_source_url;
use crate::domain::{EntitySource, ExternalIds, WikipediaLink};

static WIKIDATA_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(Q[0-9]+)$").expect("wikidata id pattern is valid"));

const WIKIDATA_KEYS: &[&str] = &["wikidata_id", "wikidataId", "wikidata", "identifier"];
const WIKIPEDIA_KEYS: &[&str] = &["wikipedia_url", "wikipedia"];

/// Uppercase `Q123` form of a Wikidata id, or `None` when it isn't one
pub fn normalize_wikidata_id(raw: &str) -> Option<String> {
    WIKIDATA_ID
        .captures(raw.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_uppercase())
}

/// Collect identifiers from the entity's own properties first, then its sources
pub fn extract(properties: &Map<String, Value>, sources: &[EntitySource]) -> ExternalIds {
    let mut ids = ExternalIds::default();

    for key in WIKIDATA_KEYS {
        if ids.wikidata_id.is_some() {
            break;
        }
        if let Some(value) = properties.get(*key) {
            ids.wikidata_id = wikidata_from_value(value);
        }
    }

    let mut candidate_urls: Vec<&str> = Vec::new();
    if let Some(same_as) = properties.get("sameAs") {
        match same_as {
            Value::String(url) => candidate_urls.push(url),
            Value::Array(items) => candidate_urls.extend(items.iter().filter_map(Value::as_str)),
            _ => {}
        }
    }
    for key in WIKIPEDIA_KEYS {
        if let Some(url) = properties.get(*key).and_then(Value::as_str) {
            candidate_urls.push(url);
        }
    }
    candidate_urls.extend(sources.iter().map(|s| s.url.as_str()));

    for raw in candidate_urls {
        if ids.wikidata_id.is_none() {
            ids.wikidata_id = wikidata_from_url(raw);
        }
        if let Some(link) = wikipedia_link(raw) {
            if !ids.wikipedia_links.iter().any(|l| l.url == link.url) {
                ids.wikipedia_links.push(link);
            }
        }
    }

    ids
}

fn wikidata_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(raw) => normalize_wikidata_id(raw).or_else(|| wikidata_from_url(raw)),
        Value::Object(obj) => obj.get("value").and_then(wikidata_from_value),
        _ => None,
    }
}

fn wikidata_from_url(raw: &str) -> Option<String> {
    let url = parse_source_url(raw).ok()?;
    let host = url.host_str()?.to_lowercase();
    if host != "wikidata.org" && !host.ends_with(".wikidata.org") {
        return None;
    }
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .and_then(normalize_wikidata_id)
}

fn wikipedia_link(raw: &str) -> Option<WikipediaLink> {
    let url = parse_source_url(raw).ok()?;
    let host = url.host_str()?.to_lowercase();
    let prefix = host.strip_suffix(".wikipedia.org")?;
    let language = prefix.strip_suffix(".m").unwrap_or(prefix);
    if language.is_empty() || language == "www" || language.contains('.') {
        return None;
    }
    Some(WikipediaLink {
        language: language.to_string(),
        url: raw.trim().to_string(),
    })
}
