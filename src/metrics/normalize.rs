//! Normalize phase metrics

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct NormalizeMetrics;

impl NormalizeMetrics {
    pub fn record_outputs_parsed(records: usize) {
        ::metrics::counter!(phase_metric!(counter, "normalize", "outputs_parsed")).increment(1);
        ::metrics::counter!(phase_metric!(counter, "normalize", "records_produced"))
            .increment(records as u64);
    }

    /// Agent output that produced no entities; `reason` is the warning code
    pub fn record_format_warning(reason: &'static str) {
        ::metrics::counter!(phase_metric!(counter, "normalize", "format_warnings"), "reason" => reason)
            .increment(1);
    }

    pub fn record_duration(duration_secs: f64) {
        ::metrics::histogram!(phase_metric!(histogram, "normalize", "duration_seconds"))
            .record(duration_secs);
    }
}

impl PhaseMetrics for NormalizeMetrics {
    fn register_metrics() {
        use metrics::{counter, histogram};

        let _ = counter!(phase_metric!(counter, "normalize", "outputs_parsed"));
        let _ = counter!(phase_metric!(counter, "normalize", "records_produced"));
        let _ = counter!(phase_metric!(counter, "normalize", "format_warnings"));
        let _ = histogram!(phase_metric!(histogram, "normalize", "duration_seconds"));
    }

    fn phase_name() -> &'static str {
        "normalize"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "normalize", "outputs_parsed"),
                metric_type: MetricType::Counter,
                help: "Agent outputs handed to the normalizer",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "normalize", "records_produced"),
                metric_type: MetricType::Counter,
                help: "Raw entity records extracted from agent output",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "normalize", "format_warnings"),
                metric_type: MetricType::Counter,
                help: "Agent outputs that yielded no entities",
                labels: vec!["reason"],
            },
            MetricDoc {
                name: phase_metric!(histogram, "normalize", "duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Time spent normalizing one agent output",
                labels: vec![],
            },
        ]
    }
}
