// Pipeline processing: normalization, validation, deduplication and assembly

pub mod assemble;
pub mod conflation;
pub mod normalize;
pub mod quality_gate;
pub mod validation_metrics;
