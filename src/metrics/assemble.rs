//! Assemble phase metrics

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct AssembleMetrics;

impl AssembleMetrics {
    pub fn record_document(status: &'static str, entities: usize, duration_secs: f64) {
        ::metrics::counter!(phase_metric!(counter, "assemble", "documents"), "status" => status)
            .increment(1);
        ::metrics::gauge!(phase_metric!(gauge, "assemble", "last_entity_count")).set(entities as f64);
        ::metrics::histogram!(phase_metric!(histogram, "assemble", "run_duration_seconds"))
            .record(duration_secs);
    }

    pub fn record_output_failure() {
        ::metrics::counter!(phase_metric!(counter, "assemble", "output_failures")).increment(1);
    }
}

impl PhaseMetrics for AssembleMetrics {
    fn register_metrics() {
        use metrics::{counter, gauge, histogram};

        let _ = counter!(phase_metric!(counter, "assemble", "documents"));
        let _ = counter!(phase_metric!(counter, "assemble", "output_failures"));
        let _ = gauge!(phase_metric!(gauge, "assemble", "last_entity_count"));
        let _ = histogram!(phase_metric!(histogram, "assemble", "run_duration_seconds"));
    }

    fn phase_name() -> &'static str {
        "assemble"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "assemble", "documents"),
                metric_type: MetricType::Counter,
                help: "Sachstand documents assembled by completion status",
                labels: vec!["status"],
            },
            MetricDoc {
                name: phase_metric!(counter, "assemble", "output_failures"),
                metric_type: MetricType::Counter,
                help: "Documents the output port failed to persist",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(gauge, "assemble", "last_entity_count"),
                metric_type: MetricType::Gauge,
                help: "Entities in the most recently assembled document",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(histogram, "assemble", "run_duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "End-to-end pipeline run duration",
                labels: vec![],
            },
        ]
    }
}
