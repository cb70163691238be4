//! Quality gate phase metrics: entity checks, scores and URL verification

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct QualityGateMetrics;

impl QualityGateMetrics {
    pub fn record_entity_valid(quality_score: f64) {
        ::metrics::counter!(phase_metric!(counter, "quality_gate", "entities_valid")).increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "quality_gate", "quality_score"))
            .record(quality_score);
    }

    pub fn record_entity_rejected(quality_score: f64) {
        ::metrics::counter!(phase_metric!(counter, "quality_gate", "entities_rejected")).increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "quality_gate", "quality_score"))
            .record(quality_score);
    }

    pub fn record_rejection_reason(reason: &'static str) {
        ::metrics::counter!(phase_metric!(counter, "quality_gate", "rejection_reasons"), "reason" => reason)
            .increment(1);
    }

    /// One live URL check; `outcome` is the verification status code
    pub fn record_url_check(outcome: &'static str) {
        ::metrics::counter!(phase_metric!(counter, "quality_gate", "url_checks"), "outcome" => outcome)
            .increment(1);
    }

    pub fn record_url_verifier_failure() {
        ::metrics::counter!(phase_metric!(counter, "quality_gate", "url_verifier_failures")).increment(1);
    }

    pub fn record_schema_issues(count: usize) {
        ::metrics::counter!(phase_metric!(counter, "quality_gate", "schema_issues")).increment(count as u64);
    }
}

impl PhaseMetrics for QualityGateMetrics {
    fn register_metrics() {
        use metrics::{counter, histogram};

        let _ = counter!(phase_metric!(counter, "quality_gate", "entities_valid"));
        let _ = counter!(phase_metric!(counter, "quality_gate", "entities_rejected"));
        let _ = counter!(phase_metric!(counter, "quality_gate", "rejection_reasons"));
        let _ = counter!(phase_metric!(counter, "quality_gate", "url_checks"));
        let _ = counter!(phase_metric!(counter, "quality_gate", "url_verifier_failures"));
        let _ = counter!(phase_metric!(counter, "quality_gate", "schema_issues"));
        let _ = histogram!(phase_metric!(histogram, "quality_gate", "quality_score"));
    }

    fn phase_name() -> &'static str {
        "quality_gate"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "quality_gate", "entities_valid"),
                metric_type: MetricType::Counter,
                help: "Entities accepted by the validator",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "quality_gate", "entities_rejected"),
                metric_type: MetricType::Counter,
                help: "Entities rejected by the validator",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "quality_gate", "rejection_reasons"),
                metric_type: MetricType::Counter,
                help: "Rejection reasons attached to rejected entities",
                labels: vec!["reason"],
            },
            MetricDoc {
                name: phase_metric!(counter, "quality_gate", "url_checks"),
                metric_type: MetricType::Counter,
                help: "Live source URL checks by outcome",
                labels: vec!["outcome"],
            },
            MetricDoc {
                name: phase_metric!(counter, "quality_gate", "url_verifier_failures"),
                metric_type: MetricType::Counter,
                help: "URL verifier calls that failed as a whole",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "quality_gate", "schema_issues"),
                metric_type: MetricType::Counter,
                help: "Advisory schema issues found on rendered entities",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(histogram, "quality_gate", "quality_score"),
                metric_type: MetricType::Histogram,
                help: "Distribution of entity quality scores",
                labels: vec![],
            },
        ]
    }
}
