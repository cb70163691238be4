use async_trait::async_trait;
use jsonschema::JSONSchema;
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::app::ports::{SchemaCorrection, SchemaReport, SchemaValidatorPort};
use crate::error::{PipelineError, Result};
use crate::pipeline::processing::quality_gate::external_ids::normalize_wikidata_id;

const BUNDLED_ENTITY_SCHEMA: &str = include_str!("../../schemas/entity.v1.json");
const BUNDLED_DOCUMENT_SCHEMA: &str = include_str!("../../schemas/sachstand.v1.json");

/// Compile a JSON Schema, reporting compile errors as `PipelineError::Schema`
pub fn compile_schema(schema: &Value) -> Result<JSONSchema> {
    JSONSchema::options()
        .compile(schema)
        .map_err(|e| PipelineError::Schema(format!("{} at {}", e, e.schema_path)))
}

/// Every violation of `schema` in `instance`, as "message at /path"
pub fn schema_violations(schema: &JSONSchema, instance: &Value) -> Vec<String> {
    match schema.validate(instance) {
        Ok(()) => Vec::new(),
        Err(errors) => errors
            .map(|error| format!("{} at {}", error, error.instance_path))
            .collect(),
    }
}

/// The Sachstand document schema from `path`, or the bundled one
pub fn document_schema(path: Option<&Path>) -> Result<JSONSchema> {
    let schema: Value = match path {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => serde_json::from_str(BUNDLED_DOCUMENT_SCHEMA)?,
    };
    compile_schema(&schema)
}

/// Violations of the document schema in the Sachstand file at `path`
pub fn check_document_file(path: &Path, schema: Option<&Path>) -> Result<Vec<String>> {
    let compiled = document_schema(schema)?;
    let instance: Value = serde_json::from_str(&fs::read_to_string(path)?)?;
    Ok(schema_violations(&compiled, &instance))
}

/// Checks rendered entity nodes against the entity JSON Schema and suggests fixes
pub struct JsonSchemaEntityValidator {
    schema: JSONSchema,
}

impl JsonSchemaEntityValidator {
    pub fn bundled() -> Result<Self> {
        let schema: Value = serde_json::from_str(BUNDLED_ENTITY_SCHEMA)?;
        Self::from_value(&schema)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let schema: Value = serde_json::from_str(&fs::read_to_string(path)?)?;
        Self::from_value(&schema)
    }

    pub fn from_value(schema: &Value) -> Result<Self> {
        Ok(Self {
            schema: compile_schema(schema)?,
        })
    }

    fn corrections(entity: &Value) -> Vec<SchemaCorrection> {
        let mut corrections = Vec::new();

        if let Some(name) = entity.get("name").and_then(Value::as_str) {
            let collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ");
            if collapsed != name {
                corrections.push(SchemaCorrection {
                    field: "name".to_string(),
                    suggested: Value::String(collapsed),
                });
            }
        }

        if let Some(raw) = entity.pointer("/identifier/value").and_then(Value::as_str) {
            if let Some(q) = normalize_wikidata_id(raw).filter(|q| q != raw) {
                corrections.push(SchemaCorrection {
                    field: "identifier.value".to_string(),
                    suggested: Value::String(q),
                });
            }
        }

        corrections
    }
}

#[async_trait]
impl SchemaValidatorPort for JsonSchemaEntityValidator {
    async fn validate_schema(&self, entity: &Value) -> anyhow::Result<SchemaReport> {
        let issues = schema_violations(&self.schema, entity);
        Ok(SchemaReport {
            valid: issues.is_empty(),
            issues,
            corrections: Self::corrections(entity),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node() -> Value {
        json!({
            "@type": "Person",
            "@id": "urn:uuid:2f1c1b9e-5d0a-5c4e-9b7a-0c1d2e3f4a5b",
            "name": "Manfred Lucha",
            "description": "Minister für Soziales, Gesundheit und Integration",
            "jobTitle": "Minister",
            "citation": [{
                "@type": "WebPage",
                "url": "https://sozialministerium.baden-wuerttemberg.de/x",
                "dateAccessed": "2025-03-14"
            }],
            "sameAs": ["https://www.wikidata.org/wiki/Q1889089"],
            "identifier": {"@type": "PropertyValue", "propertyID": "wikidata", "value": "Q1889089"}
        })
    }

    #[tokio::test]
    async fn test_rendered_node_is_valid() {
        let validator = JsonSchemaEntityValidator::bundled().unwrap();

        let report = validator.validate_schema(&node()).await.unwrap();

        assert!(report.valid, "unexpected issues: {:?}", report.issues);
        assert!(report.corrections.is_empty());
    }

    #[tokio::test]
    async fn test_issues_and_corrections_are_reported() {
        let validator = JsonSchemaEntityValidator::bundled().unwrap();
        let mut entity = node();
        entity["name"] = json!("Manfred  Lucha ");
        entity["citation"] = json!([]);
        entity["identifier"]["value"] = json!("q1889089");

        let report = validator.validate_schema(&entity).await.unwrap();

        assert!(!report.valid);
        assert!(report.issues.iter().any(|i| i.contains("/citation")));
        let fields: Vec<&str> = report.corrections.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "identifier.value"]);
        assert_eq!(report.corrections[0].suggested, json!("Manfred Lucha"));
        assert_eq!(report.corrections[1].suggested, json!("Q1889089"));
    }

    #[test]
    fn test_document_schema_rejects_unknown_status() {
        let schema = document_schema(None).unwrap();
        let document = json!({
            "@context": "https://schema.org",
            "@type": "ResearchReport",
            "@id": "urn:uuid:6c0e3c3a-1f4e-5e4f-8a8e-3b7f0f1d2c3b",
            "name": "Pflegepolitik BW",
            "dateCreated": "2025-03-14T09:30:00Z",
            "hasPart": [],
            "completionStatus": "done",
            "validationMetrics": {}
        });

        let violations = schema_violations(&schema, &document);

        assert!(violations.iter().any(|v| v.contains("/completionStatus")));
        assert!(violations.iter().any(|v| v.contains("/validationMetrics")));
    }

    #[test]
    fn test_broken_schema_is_an_error() {
        let result = JsonSchemaEntityValidator::from_value(&json!({"pattern": "(unclosed"}));
        assert!(matches!(result, Err(PipelineError::Schema(_))));
    }
}
