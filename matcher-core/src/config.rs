//! Engine configuration: the merge of built-in defaults with a cohort's
//! raw overrides.
//!
//! The effective configuration is an immutable value captured inside
//! [`crate::prepare::PreparedInputs`]; nothing reads ambient state during
//! solving.

use serde::{Deserialize, Serialize};

fn default_rank_weight() -> f64 {
    0.6
}

fn default_tag_overlap_weight() -> f64 {
    0.2
}

fn default_attribute_match_weight() -> f64 {
    0.2
}

fn default_min_options_strict() -> usize {
    3
}

fn default_strict_time_limit() -> u64 {
    5
}

fn default_exception_time_limit() -> u64 {
    10
}

fn default_penalty_org() -> i64 {
    1_000_000
}

fn default_penalty_neither() -> i64 {
    300_000
}

fn default_penalty_one_sided() -> i64 {
    100_000
}

fn default_score_scale() -> i64 {
    1000
}

fn default_ambiguity_gap_threshold() -> f64 {
    5.0
}

/// All tunables of the matching engine. Every field has a default; a cohort
/// overrides individual keys through its `config` map.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Scorer: weight of the mutual-rank component.
    pub rank_weight: f64,
    /// Scorer: weight of the expertise-tag overlap component.
    pub tag_overlap_weight: f64,
    /// Scorer: weight of the desired-attribute component.
    pub attribute_match_weight: f64,
    /// Readiness: required cross-org mutual options per participant.
    pub min_options_strict: usize,
    /// Strict solver time budget, seconds.
    pub strict_time_limit: u64,
    /// Exception solver time budget, seconds.
    pub exception_time_limit: u64,
    /// Penalty for a same-organization pairing (E3).
    pub penalty_org: i64,
    /// Penalty for a pairing neither side ranked (E2).
    pub penalty_neither: i64,
    /// Penalty for a one-sided pairing (E1).
    pub penalty_one_sided: i64,
    /// Integer granularity of the solver objective: scaled score =
    /// `round(percentage * score_scale)`.
    pub score_scale: i64,
    /// Percent gap at or under which a match counts as ambiguous.
    pub ambiguity_gap_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            rank_weight: default_rank_weight(),
            tag_overlap_weight: default_tag_overlap_weight(),
            attribute_match_weight: default_attribute_match_weight(),
            min_options_strict: default_min_options_strict(),
            strict_time_limit: default_strict_time_limit(),
            exception_time_limit: default_exception_time_limit(),
            penalty_org: default_penalty_org(),
            penalty_neither: default_penalty_neither(),
            penalty_one_sided: default_penalty_one_sided(),
            score_scale: default_score_scale(),
            ambiguity_gap_threshold: default_ambiguity_gap_threshold(),
        }
    }
}

impl EngineConfig {
    /// Builds the effective configuration from a cohort's raw overrides.
    ///
    /// Unknown keys are ignored; a type-invalid override map falls back to
    /// the defaults with a warning rather than failing the run.
    pub fn from_overrides(overrides: &serde_json::Map<String, serde_json::Value>) -> Self {
        match serde_json::from_value(serde_json::Value::Object(overrides.clone())) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("invalid cohort config overrides, using defaults: {err}");
                EngineConfig::default()
            }
        }
    }

    /// Smallest configured penalty. Aggregate scores must stay below this
    /// for the penalty ordering to act lexicographically.
    pub fn min_penalty(&self) -> i64 {
        self.penalty_one_sided
            .min(self.penalty_neither)
            .min(self.penalty_org)
    }
}
