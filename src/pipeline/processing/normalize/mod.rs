pub mod shapes;
pub mod type_names;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::constants::AGENT_ERROR_SENTINELS;
use crate::domain::RawEntityRecord;
use shapes::RawShape;

static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").expect("fence pattern is valid")
});

/// Agent output as handed over by the orchestration layer
#[derive(Debug, Clone, Copy)]
pub enum AgentOutput<'a> {
    Text(&'a str),
    Json(&'a Value),
}

/// Why normalization produced no entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatWarningReason {
    /// The agent reported that it failed
    AgentError,
    /// Valid JSON without any known entity layout
    UnrecognizedShape,
    /// Text that is neither JSON nor an agent error message
    MalformedJson,
}

impl FormatWarningReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatWarningReason::AgentError => "agent_error",
            FormatWarningReason::UnrecognizedShape => "unrecognized_shape",
            FormatWarningReason::MalformedJson => "malformed_json",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatWarning {
    pub reason: FormatWarningReason,
    /// Short excerpt of the offending input for the logs
    pub detail: String,
}

impl FormatWarning {
    fn new(reason: FormatWarningReason, input: &str) -> Self {
        Self {
            reason,
            detail: input.chars().take(120).collect(),
        }
    }
}

/// Result of normalizing one agent output.
///
/// `Entities(vec![])` means the agent answered and found nothing;
/// `EmptyWithWarning` means there was nothing usable to read.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Entities(Vec<RawEntityRecord>),
    EmptyWithWarning(FormatWarning),
}

impl ParseOutcome {
    pub fn records(&self) -> &[RawEntityRecord] {
        match self {
            ParseOutcome::Entities(records) => records,
            ParseOutcome::EmptyWithWarning(_) => &[],
        }
    }

    pub fn warning(&self) -> Option<&FormatWarning> {
        match self {
            ParseOutcome::Entities(_) => None,
            ParseOutcome::EmptyWithWarning(warning) => Some(warning),
        }
    }

    pub fn into_parts(self) -> (Vec<RawEntityRecord>, Option<FormatWarning>) {
        match self {
            ParseOutcome::Entities(records) => (records, None),
            ParseOutcome::EmptyWithWarning(warning) => (Vec::new(), Some(warning)),
        }
    }
}

/// Trait for turning raw agent output into raw entity records
pub trait Normalizer {
    /// Never fails: anything unreadable becomes `EmptyWithWarning`
    fn normalize(&self, output: AgentOutput<'_>) -> ParseOutcome;
}

/// Normalizer for the JSON layouts research agents produce
pub struct DefaultNormalizer {
    sentinels: Vec<String>,
}

impl DefaultNormalizer {
    pub fn new() -> Self {
        Self::with_sentinels(AGENT_ERROR_SENTINELS.iter().map(|s| s.to_string()).collect())
    }

    /// Create a normalizer with a custom list of agent error phrases
    pub fn with_sentinels(sentinels: Vec<String>) -> Self {
        Self {
            sentinels: sentinels.into_iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    fn normalize_value(&self, value: &Value) -> ParseOutcome {
        if let Value::String(text) = value {
            return self.normalize_text(text);
        }

        match RawShape::classify(value) {
            Some(shape) => {
                debug!(?shape, "Recognized agent output shape");
                ParseOutcome::Entities(shape.into_records())
            }
            None => {
                let rendered = value.to_string();
                if self.is_agent_error(&rendered) {
                    return ParseOutcome::EmptyWithWarning(FormatWarning::new(
                        FormatWarningReason::AgentError,
                        &rendered,
                    ));
                }
                ParseOutcome::EmptyWithWarning(FormatWarning::new(
                    FormatWarningReason::UnrecognizedShape,
                    &rendered,
                ))
            }
        }
    }

    fn normalize_text(&self, text: &str) -> ParseOutcome {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return ParseOutcome::EmptyWithWarning(FormatWarning::new(
                FormatWarningReason::UnrecognizedShape,
                trimmed,
            ));
        }

        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return self.normalize_value(&value);
        }

        if let Some(value) = strip_fences(trimmed).and_then(|inner| parse_json(&inner)) {
            debug!("Parsed markdown-fenced agent output");
            return self.normalize_value(&value);
        }

        if self.is_agent_error(trimmed) {
            return ParseOutcome::EmptyWithWarning(FormatWarning::new(
                FormatWarningReason::AgentError,
                trimmed,
            ));
        }

        if let Some(value) = embedded_json(trimmed) {
            debug!("Parsed JSON embedded in prose");
            return self.normalize_value(&value);
        }

        ParseOutcome::EmptyWithWarning(FormatWarning::new(
            FormatWarningReason::MalformedJson,
            trimmed,
        ))
    }

    fn is_agent_error(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.sentinels.iter().any(|s| lowered.contains(s.as_str()))
    }
}

impl Default for DefaultNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer for DefaultNormalizer {
    fn normalize(&self, output: AgentOutput<'_>) -> ParseOutcome {
        let outcome = match output {
            AgentOutput::Text(text) => self.normalize_text(text),
            AgentOutput::Json(value) => self.normalize_value(value),
        };

        match outcome.warning() {
            Some(warning) => warn!(
                reason = warning.reason.as_str(),
                detail = %warning.detail,
                "Agent output yielded no entities"
            ),
            None => info!(records = outcome.records().len(), "Normalized agent output"),
        }

        outcome
    }
}

fn parse_json(text: &str) -> Option<Value> {
    serde_json::from_str(text.trim()).ok()
}

/// Contents of the first markdown code fence; tolerates a missing closing fence
fn strip_fences(text: &str) -> Option<String> {
    if let Some(captures) = FENCED_BLOCK.captures(text) {
        return captures.get(1).map(|m| m.as_str().to_string());
    }
    let rest = text.strip_prefix("```")?;
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    Some(body.trim_end_matches('`').to_string())
}

/// The outermost `{...}` or `[...]` span of a reply that wraps JSON in prose
fn embedded_json(text: &str) -> Option<Value> {
    let start = text.find(|c: char| c == '{' || c == '[')?;
    let closing = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(closing)?;
    if end <= start {
        return None;
    }
    parse_json(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize_text(text: &str) -> ParseOutcome {
        DefaultNormalizer::new().normalize(AgentOutput::Text(text))
    }

    #[test]
    fn test_grouped_object_from_text() {
        let outcome = normalize_text(
            r#"{"Person Entities": [{"name": "Dr. Manfred Lucha", "jobTitle": "Minister",
                "sources": [{"url": "https://sozialministerium.baden-wuerttemberg.de/x"}]}]}"#,
        );

        assert!(outcome.warning().is_none());
        assert_eq!(outcome.records().len(), 1);
        assert_eq!(outcome.records()[0].declared_type, "Person");
        assert_eq!(outcome.records()[0].sources.len(), 1);
    }

    #[test]
    fn test_markdown_fenced_json_is_unwrapped() {
        let text = "Here is what I found:\n```json\n[{\"type\": \"Topic\", \"name\": \"Pflegereform\"}]\n```\nLet me know.";

        let outcome = normalize_text(text);

        assert_eq!(outcome.records().len(), 1);
        assert_eq!(outcome.records()[0].name, "Pflegereform");
    }

    #[test]
    fn test_unterminated_fence_is_tolerated() {
        let outcome = normalize_text("```json\n{\"Policy\": [{\"name\": \"Pflegestärkungsgesetz\"}]}");

        assert_eq!(outcome.records().len(), 1);
        assert_eq!(outcome.records()[0].declared_type, "Policy");
    }

    #[test]
    fn test_sentinel_error_is_empty_with_agent_error_warning() {
        let outcome = normalize_text("An error occurred during execution.");

        assert!(outcome.records().is_empty());
        assert_eq!(
            outcome.warning().map(|w| w.reason),
            Some(FormatWarningReason::AgentError)
        );
    }

    #[test]
    fn test_sentinel_inside_json_string_is_detected() {
        let value = json!("An error occurred during execution: rate limit");
        let outcome = DefaultNormalizer::new().normalize(AgentOutput::Json(&value));

        assert_eq!(
            outcome.warning().map(|w| w.reason),
            Some(FormatWarningReason::AgentError)
        );
    }

    #[test]
    fn test_unknown_shape_is_recoverable() {
        let value = json!({"status": "ok", "count": 3});
        let outcome = DefaultNormalizer::new().normalize(AgentOutput::Json(&value));

        assert!(outcome.records().is_empty());
        assert_eq!(
            outcome.warning().map(|w| w.reason),
            Some(FormatWarningReason::UnrecognizedShape)
        );
    }

    #[test]
    fn test_garbage_text_is_malformed_json() {
        let outcome = normalize_text("{\"Person\": [ {\"name\": ");

        assert_eq!(
            outcome.warning().map(|w| w.reason),
            Some(FormatWarningReason::MalformedJson)
        );
    }

    #[test]
    fn test_empty_group_is_entities_not_warning() {
        let outcome = normalize_text(r#"{"Person": [], "Organization": []}"#);

        assert_eq!(outcome, ParseOutcome::Entities(Vec::new()));
    }

    #[test]
    fn test_json_in_prose_is_found() {
        let outcome = normalize_text(
            "Result follows {\"Event\": [{\"name\": \"Pflegegipfel 2025\"}]} end of result",
        );

        assert_eq!(outcome.records().len(), 1);
    }

    #[test]
    fn test_custom_sentinels() {
        let normalizer = DefaultNormalizer::with_sentinels(vec!["Kein Ergebnis".to_string()]);
        let outcome = normalizer.normalize(AgentOutput::Text("kein ergebnis gefunden"));

        assert_eq!(
            outcome.warning().map(|w| w.reason),
            Some(FormatWarningReason::AgentError)
        );
    }
}
