// Entity pipeline stages, in data-flow order under processing/

pub mod processing;

pub use processing::assemble::{CompletionSignal, CompletionStatus, DocumentAssembler, RunMetadata, Sachstand};
pub use processing::conflation::{Conflator, DeduplicationOutcome, Deduplicator};
pub use processing::normalize::{AgentOutput, DefaultNormalizer, Normalizer, ParseOutcome};
pub use processing::quality_gate::{EntityValidator, QualityGate, ValidatorConfig};
pub use processing::validation_metrics::{MetricsAggregator, ValidationMetrics};
