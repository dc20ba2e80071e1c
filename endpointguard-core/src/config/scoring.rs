//! Scoring configuration (spec §4.9, §6).
//!
//! Canonical defaults per spec §9's open-question resolution: the
//! 15/6/3/1 severity-penalty table with 1.0/0.25/0.1 confidence weights
//! (the source's other 25/10/3/1 table is not used).

use serde::{Deserialize, Serialize};

use crate::model::{Confidence, Severity};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Penalties {
    pub critical: f64,
    pub high: f64,
    pub med: f64,
    pub low: f64,
}

impl Default for Penalties {
    fn default() -> Self {
        Self {
            critical: 15.0,
            high: 6.0,
            med: 3.0,
            low: 1.0,
        }
    }
}

impl Penalties {
    pub fn for_severity(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Med => self.med,
            Severity::Low => self.low,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceWeights {
    pub high: f64,
    pub med: f64,
    pub low: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            high: 1.0,
            med: 0.25,
            low: 0.1,
        }
    }
}

impl ConfidenceWeights {
    pub fn for_confidence(&self, confidence: Confidence) -> f64 {
        match confidence {
            Confidence::High => self.high,
            Confidence::Med => self.med,
            Confidence::Low => self.low,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScoringConfig {
    pub start: f64,
    pub penalties: Penalties,
    pub max_penalty_per_rule: Option<f64>,
    pub confidence_weights: Option<ConfidenceWeights>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            start: 100.0,
            penalties: Penalties::default(),
            max_penalty_per_rule: Some(35.0),
            confidence_weights: Some(ConfidenceWeights::default()),
        }
    }
}

impl ScoringConfig {
    pub fn confidence_weights(&self) -> ConfidenceWeights {
        self.confidence_weights.clone().unwrap_or_default()
    }

    pub fn max_penalty_per_rule(&self) -> f64 {
        self.max_penalty_per_rule.unwrap_or(self.start * 0.35)
    }
}
