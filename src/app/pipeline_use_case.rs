use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::app::ports::{
    DocumentOutputPort, SchemaReport, SchemaValidatorPort, UrlCheckResult, UrlVerifierPort,
};
use crate::constants::DEFAULT_SCHEMA_CHECK_TIMEOUT_SECS;
use crate::domain::{RawEntityRecord, UrlVerification, ValidatedEntity};
use crate::metrics::{AssembleMetrics, ConflationMetrics, NormalizeMetrics, QualityGateMetrics};
use crate::pipeline::processing::assemble::{CompletionSignal, DocumentAssembler, RunMetadata, Sachstand};
use crate::pipeline::processing::conflation::{Conflator, Deduplicator};
use crate::pipeline::processing::normalize::{AgentOutput, DefaultNormalizer, FormatWarning, Normalizer};
use crate::pipeline::processing::quality_gate::url_rules::parse_source_url;
use crate::pipeline::processing::quality_gate::{EntityValidator, QualityGate, UrlChecks};
use crate::pipeline::processing::validation_metrics::MetricsAggregator;

/// Schema findings for one rendered entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySchemaReport {
    pub entity_id: String,
    pub report: SchemaReport,
}

/// Everything one pipeline run produced
#[derive(Debug, Clone)]
pub struct PipelineRunResult {
    pub document: Sachstand,
    /// Set when the agent output yielded no entities
    pub warning: Option<FormatWarning>,
    pub url_reports: Vec<UrlCheckResult>,
    pub schema_reports: Vec<EntitySchemaReport>,
}

/// Runs normalizer, validator, deduplicator and assembler over one agent output
pub struct PipelineUseCase {
    normalizer: Box<dyn Normalizer + Send + Sync>,
    validator: EntityValidator,
    deduplicator: Box<dyn Conflator + Send + Sync>,
    assembler: DocumentAssembler,
    url_verifier: Option<Arc<dyn UrlVerifierPort>>,
    schema_validator: Option<Arc<dyn SchemaValidatorPort>>,
    output_port: Option<Arc<dyn DocumentOutputPort>>,
    schema_timeout: Duration,
}

impl PipelineUseCase {
    pub fn new(validator: EntityValidator) -> Self {
        Self {
            normalizer: Box::new(DefaultNormalizer::new()),
            deduplicator: Box::new(Deduplicator::new(validator.clone())),
            validator,
            assembler: DocumentAssembler::new(),
            url_verifier: None,
            schema_validator: None,
            output_port: None,
            schema_timeout: Duration::from_secs(DEFAULT_SCHEMA_CHECK_TIMEOUT_SECS),
        }
    }

    pub fn with_normalizer(mut self, normalizer: Box<dyn Normalizer + Send + Sync>) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_url_verifier(mut self, verifier: Arc<dyn UrlVerifierPort>) -> Self {
        self.url_verifier = Some(verifier);
        self
    }

    pub fn with_schema_validator(mut self, validator: Arc<dyn SchemaValidatorPort>, timeout: Duration) -> Self {
        self.schema_validator = Some(validator);
        self.schema_timeout = timeout;
        self
    }

    pub fn with_output(mut self, output_port: Arc<dyn DocumentOutputPort>) -> Self {
        self.output_port = Some(output_port);
        self
    }

    pub async fn run(
        &self,
        input: AgentOutput<'_>,
        topic: &str,
        signal: CompletionSignal,
    ) -> PipelineRunResult {
        self.run_at(input, topic, signal, Utc::now()).await
    }

    /// Run with a fixed timestamp; the same input and timestamp give the same document
    #[instrument(name = "pipeline_run", skip(self, input, topic, timestamp), fields(topic = %topic))]
    pub async fn run_at(
        &self,
        input: AgentOutput<'_>,
        topic: &str,
        signal: CompletionSignal,
        timestamp: DateTime<Utc>,
    ) -> PipelineRunResult {
        let started = Instant::now();

        let (records, warning) = self.normalizer.normalize(input).into_parts();
        NormalizeMetrics::record_outputs_parsed(records.len());
        NormalizeMetrics::record_duration(started.elapsed().as_secs_f64());
        if let Some(w) = &warning {
            NormalizeMetrics::record_format_warning(w.reason.as_str());
        }

        let (url_checks, url_reports) = self.check_urls(&records).await;

        let validated: Vec<ValidatedEntity> = records
            .iter()
            .map(|record| self.validator.assess(record, &url_checks))
            .collect();
        for entity in &validated {
            if entity.is_valid() {
                QualityGateMetrics::record_entity_valid(entity.quality_score);
            } else {
                QualityGateMetrics::record_entity_rejected(entity.quality_score);
                for reason in &entity.rejection_reasons {
                    QualityGateMetrics::record_rejection_reason(reason.as_str());
                }
            }
        }

        let mut aggregator = MetricsAggregator::new();
        aggregator.record_validation(&validated);

        let outcome = self.deduplicator.deduplicate(&validated);
        aggregator.record_dedup(&outcome);
        ConflationMetrics::record_run(
            validated.iter().filter(|e| e.is_valid()).count(),
            outcome.entities.len(),
            outcome.dedup_by_identifier,
            outcome.dedup_by_name,
        );

        let run = RunMetadata::new(topic, timestamp, signal).with_normalizer_result(records.len(), warning.clone());
        let mut document = self.assembler.assemble(&outcome.entities, &run, aggregator.finalize());

        let schema_reports = self.check_schema(&document).await;
        let issue_count: usize = schema_reports.iter().map(|r| r.report.issues.len()).sum();
        if issue_count > 0 {
            QualityGateMetrics::record_schema_issues(issue_count);
        }
        aggregator.record_schema_issues(issue_count);
        document.validation_metrics = aggregator.finalize();

        if let Some(output) = &self.output_port {
            if let Err(e) = output.write_document(&document).await {
                warn!("Failed to write Sachstand: {}", e);
                AssembleMetrics::record_output_failure();
            }
        }

        let status = document.completion_status.as_str();
        AssembleMetrics::record_document(status, document.has_part.len(), started.elapsed().as_secs_f64());

        info!(
            records = records.len(),
            valid = document.validation_metrics.valid_entities,
            rejected = document.validation_metrics.rejected_entities,
            entities = document.has_part.len(),
            status,
            rule_version = self.validator.config().rule_version.as_str(),
            "Pipeline run finished in {:.2}ms",
            started.elapsed().as_secs_f64() * 1000.0
        );

        PipelineRunResult {
            document,
            warning,
            url_reports,
            schema_reports,
        }
    }

    /// Live checks for every distinct, syntactically usable, non-blacklisted source URL
    async fn check_urls(&self, records: &[RawEntityRecord]) -> (UrlChecks, Vec<UrlCheckResult>) {
        let mut checks = UrlChecks::new();
        let Some(verifier) = &self.url_verifier else {
            return (checks, Vec::new());
        };

        let patterns = self.validator.patterns();
        let urls: Vec<String> = records
            .iter()
            .flat_map(|r| r.sources.iter())
            .map(|s| s.url.trim().to_string())
            .filter(|url| parse_source_url(url).is_ok() && patterns.blacklist_match(url).is_none())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if urls.is_empty() {
            return (checks, Vec::new());
        }

        debug!(count = urls.len(), "Verifying source URLs");
        match verifier.verify_urls(&urls).await {
            Ok(response) => {
                for result in &response.results {
                    let verification = result.verification();
                    QualityGateMetrics::record_url_check(verification_code(verification));
                    checks.insert(result.url.trim().to_string(), verification);
                }
                (checks, response.results)
            }
            Err(e) => {
                warn!("URL verification failed, continuing without live checks: {}", e);
                QualityGateMetrics::record_url_verifier_failure();
                (checks, Vec::new())
            }
        }
    }

    async fn check_schema(&self, document: &Sachstand) -> Vec<EntitySchemaReport> {
        let Some(validator) = &self.schema_validator else {
            return Vec::new();
        };

        let mut reports = Vec::new();
        for node in &document.has_part {
            let value = match serde_json::to_value(node) {
                Ok(value) => value,
                Err(e) => {
                    warn!(entity = node.id.as_str(), "Could not serialize entity for schema check: {}", e);
                    continue;
                }
            };
            match tokio::time::timeout(self.schema_timeout, validator.validate_schema(&value)).await {
                Ok(Ok(report)) => {
                    for issue in &report.issues {
                        warn!(entity = node.id.as_str(), issue = issue.as_str(), "Schema issue");
                    }
                    reports.push(EntitySchemaReport {
                        entity_id: node.id.clone(),
                        report,
                    });
                }
                Ok(Err(e)) => warn!(entity = node.id.as_str(), "Schema validator failed: {}", e),
                Err(_) => warn!(entity = node.id.as_str(), "Schema validator timed out"),
            }
        }
        reports
    }
}

fn verification_code(verification: UrlVerification) -> &'static str {
    match verification {
        UrlVerification::NotChecked => "not_checked",
        UrlVerification::Accessible => "accessible",
        UrlVerification::Unverified => "unverified",
        UrlVerification::Unreachable => "unreachable",
    }
}
