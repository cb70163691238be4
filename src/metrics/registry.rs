//! Registers every phase's metrics and flags name collisions between phases.

use crate::metrics::{
    AssembleMetrics, ConflationMetrics, MetricDoc, NormalizeMetrics, PhaseMetrics,
    QualityGateMetrics,
};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Register all phase metrics; returns the number of distinct names
pub fn register_all_metrics() -> usize {
    let mut all_metrics: HashMap<&'static str, (&'static str, MetricDoc)> = HashMap::new();

    register_phase_metrics::<NormalizeMetrics>(&mut all_metrics);
    register_phase_metrics::<QualityGateMetrics>(&mut all_metrics);
    register_phase_metrics::<ConflationMetrics>(&mut all_metrics);
    register_phase_metrics::<AssembleMetrics>(&mut all_metrics);

    info!("Registered {} metrics across all phases", all_metrics.len());
    for (name, (phase, doc)) in &all_metrics {
        debug!(phase, metric = name, kind = ?doc.metric_type, help = doc.help, "Registered metric");
    }
    all_metrics.len()
}

fn register_phase_metrics<T: PhaseMetrics>(
    all_metrics: &mut HashMap<&'static str, (&'static str, MetricDoc)>,
) {
    T::register_metrics();
    let phase_name = T::phase_name();

    for doc in T::metrics_documentation() {
        if let Some((existing_phase, _)) = all_metrics.get(doc.name) {
            warn!(
                "Metric name conflict: '{}' is defined by both '{}' and '{}'",
                doc.name, existing_phase, phase_name
            );
        } else {
            all_metrics.insert(doc.name, (phase_name, doc));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn all_docs() -> Vec<MetricDoc> {
        let mut docs = NormalizeMetrics::metrics_documentation();
        docs.extend(QualityGateMetrics::metrics_documentation());
        docs.extend(ConflationMetrics::metrics_documentation());
        docs.extend(AssembleMetrics::metrics_documentation());
        docs
    }

    #[test]
    fn test_metric_names_are_unique_and_prefixed() {
        let docs = all_docs();
        let names: HashSet<&str> = docs.iter().map(|d| d.name).collect();

        assert_eq!(names.len(), docs.len());
        assert!(names.iter().all(|n| n.starts_with("sachstand_")));
    }

    #[test]
    fn test_registration_without_recorder() {
        assert_eq!(register_all_metrics(), all_docs().len());
    }
}
