//! Conflation phase metrics

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct ConflationMetrics;

impl ConflationMetrics {
    pub fn record_run(input: usize, output: usize, by_identifier: usize, by_name: usize) {
        ::metrics::counter!(phase_metric!(counter, "conflation", "entities_in")).increment(input as u64);
        ::metrics::counter!(phase_metric!(counter, "conflation", "entities_out")).increment(output as u64);
        ::metrics::counter!(phase_metric!(counter, "conflation", "merges"), "phase" => "identifier")
            .increment(by_identifier as u64);
        ::metrics::counter!(phase_metric!(counter, "conflation", "merges"), "phase" => "name")
            .increment(by_name as u64);
    }
}

impl PhaseMetrics for ConflationMetrics {
    fn register_metrics() {
        use metrics::counter;

        let _ = counter!(phase_metric!(counter, "conflation", "entities_in"));
        let _ = counter!(phase_metric!(counter, "conflation", "entities_out"));
        let _ = counter!(phase_metric!(counter, "conflation", "merges"));
    }

    fn phase_name() -> &'static str {
        "conflation"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "conflation", "entities_in"),
                metric_type: MetricType::Counter,
                help: "Valid entities entering deduplication",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "conflation", "entities_out"),
                metric_type: MetricType::Counter,
                help: "Canonical entities after deduplication",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "conflation", "merges"),
                metric_type: MetricType::Counter,
                help: "Merge groups by deduplication phase",
                labels: vec!["phase"],
            },
        ]
    }
}
