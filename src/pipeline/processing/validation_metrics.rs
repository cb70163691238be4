//! Run-level statistics reported next to the Sachstand.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::ValidatedEntity;
use crate::pipeline::processing::conflation::DeduplicationOutcome;

/// The `validationMetrics` block of a Sachstand
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationMetrics {
    pub total_entities: usize,
    pub valid_entities: usize,
    pub rejected_entities: usize,
    /// Rejection reason code -> number of rejected entities carrying it
    pub rejection_reasons: BTreeMap<String, usize>,
    pub avg_quality_score: f64,
    pub dedup_by_identifier: usize,
    pub dedup_by_name: usize,
    pub final_entity_count: usize,
    pub schema_compliance_rate: f64,
    pub dedup_rate: f64,
    #[serde(default)]
    pub schema_issue_count: usize,
}

/// Accumulates counters after validation and after deduplication
#[derive(Debug, Clone, Default)]
pub struct MetricsAggregator {
    total: usize,
    valid: usize,
    rejected: usize,
    reasons: BTreeMap<String, usize>,
    score_sum: f64,
    dedup_by_identifier: usize,
    dedup_by_name: usize,
    final_count: usize,
    schema_issues: usize,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_validation(&mut self, entities: &[ValidatedEntity]) {
        for entity in entities {
            self.total += 1;
            self.score_sum += entity.quality_score;
            if entity.is_valid() {
                self.valid += 1;
            } else {
                self.rejected += 1;
                for reason in &entity.rejection_reasons {
                    *self.reasons.entry(reason.as_str().to_string()).or_insert(0) += 1;
                }
            }
        }
    }

    pub fn record_dedup(&mut self, outcome: &DeduplicationOutcome) {
        self.dedup_by_identifier += outcome.dedup_by_identifier;
        self.dedup_by_name += outcome.dedup_by_name;
        self.final_count = outcome.entities.len();
    }

    pub fn record_schema_issues(&mut self, count: usize) {
        self.schema_issues += count;
    }

    /// Derived rates are 0 whenever their denominator is 0
    pub fn finalize(&self) -> ValidationMetrics {
        let ratio = |num: f64, den: usize| if den == 0 { 0.0 } else { num / den as f64 };

        ValidationMetrics {
            total_entities: self.total,
            valid_entities: self.valid,
            rejected_entities: self.rejected,
            rejection_reasons: self.reasons.clone(),
            avg_quality_score: ratio(self.score_sum, self.total),
            dedup_by_identifier: self.dedup_by_identifier,
            dedup_by_name: self.dedup_by_name,
            final_entity_count: self.final_count,
            schema_compliance_rate: ratio(self.valid as f64, self.total),
            dedup_rate: ratio(self.valid.saturating_sub(self.final_count) as f64, self.valid),
            schema_issue_count: self.schema_issues,
        }
    }
}
