//! Per-rule severity override (spec §6: `rules` is a map of rule-id → { severity }).

use serde::{Deserialize, Serialize};

use crate::model::Severity;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleConfig {
    pub severity: Severity,
}
