//! Process metrics for the Sachstand pipeline
//!
//! Each pipeline phase owns its metric names in a dedicated submodule.
//! These are operational counters for Prometheus and are separate from the
//! per-run `ValidationMetrics` block written into the document.

pub mod assemble;
pub mod conflation;
pub mod normalize;
pub mod quality_gate;
pub mod registry;

pub use assemble::AssembleMetrics;
pub use conflation::ConflationMetrics;
pub use normalize::NormalizeMetrics;
pub use quality_gate::QualityGateMetrics;

use std::net::SocketAddr;
use std::sync::{Once, OnceLock};
use tracing::{info, warn};

use crate::constants::METRICS_ADDR_ENV;

static INIT: Once = Once::new();
static HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder when `SACHSTAND_METRICS_ADDR` is set.
///
/// Idempotent. Without the variable the `metrics` macros stay no-ops.
pub fn init_metrics() {
    INIT.call_once(|| {
        let addr_str = match std::env::var(METRICS_ADDR_ENV) {
            Ok(v) if !v.trim().is_empty() => v,
            _ => {
                info!("{} not set, process metrics disabled", METRICS_ADDR_ENV);
                return;
            }
        };

        let addr = match addr_str.trim().parse::<SocketAddr>() {
            Ok(addr) => addr,
            Err(e) => {
                warn!("Invalid metrics addr '{}': {}", addr_str, e);
                return;
            }
        };

        let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
        match builder.install_recorder() {
            Ok(handle) => {
                if HANDLE.set(handle).is_err() {
                    warn!("Prometheus handle already stored");
                }
                info!("Prometheus exporter listening at http://{}/metrics", addr);
                registry::register_all_metrics();
            }
            Err(e) => {
                warn!("Failed to install Prometheus recorder: {}", e);
            }
        }
    });
}

/// Render the current metrics in Prometheus text format, if a recorder is installed
pub fn render() -> Option<String> {
    HANDLE.get().map(|handle| handle.render())
}

/// Trait for phase-specific metrics collections
pub trait PhaseMetrics {
    /// Pre-register every metric of the phase
    fn register_metrics();

    fn phase_name() -> &'static str;

    /// Documentation for every metric of the phase
    fn metrics_documentation() -> Vec<MetricDoc>;
}

/// Documentation for a single metric
#[derive(Debug, Clone)]
pub struct MetricDoc {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub help: &'static str,
    #[allow(dead_code)]
    pub labels: Vec<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Histogram,
    Gauge,
}

/// Metric names follow `sachstand_{phase}_{name}`, counters end in `_total`
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("sachstand_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("sachstand_", $phase, "_", $name)
    };
    (gauge, $phase:literal, $name:literal) => {
        concat!("sachstand_", $phase, "_", $name)
    };
}

pub(crate) use phase_metric;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_naming_convention() {
        assert_eq!(
            phase_metric!(counter, "quality_gate", "entities_rejected"),
            "sachstand_quality_gate_entities_rejected_total"
        );
        assert_eq!(
            phase_metric!(histogram, "quality_gate", "quality_score"),
            "sachstand_quality_gate_quality_score"
        );
        assert_eq!(
            phase_metric!(gauge, "assemble", "last_entity_count"),
            "sachstand_assemble_last_entity_count"
        );
    }

    #[test]
    fn test_render_without_recorder_is_none() {
        assert!(render().is_none());
    }
}
