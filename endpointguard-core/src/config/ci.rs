//! CI gating configuration (spec §6).

use serde::{Deserialize, Serialize};

use crate::model::{Confidence, Severity};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CiConfig {
    pub fail_on: Severity,
    pub min_confidence: Confidence,
    pub min_score: Option<i64>,
    pub max_new_critical: Option<u32>,
    pub max_new_high: Option<u32>,
}

impl Default for CiConfig {
    fn default() -> Self {
        Self {
            fail_on: Severity::High,
            min_confidence: Confidence::Med,
            min_score: Some(50),
            max_new_critical: Some(0),
            max_new_high: None,
        }
    }
}
