//! Scoring (spec §4.9) and waiver application (spec §4.10): turns a raw
//! finding list into active/waived sets and a 0–100 readiness score.

use std::collections::HashMap;

use chrono::NaiveDate;

use endpointguard_core::config::ScoringConfig;
use endpointguard_core::waiver::Waiver;

use crate::model::{Finding, ScanStatus, SeverityCounts};

pub struct ScoredFindings {
    pub active: Vec<Finding>,
    pub waived: Vec<Finding>,
    pub severity_counts: SeverityCounts,
    pub score: f64,
    pub status: ScanStatus,
}

/// Split findings into active/waived (spec §4.10: matches on rule-id and
/// file; an expired waiver is inert), then score the active set (spec §4.9).
pub fn score(findings: Vec<Finding>, waivers: &[Waiver], scoring: &ScoringConfig, now: NaiveDate) -> ScoredFindings {
    let mut active = Vec::new();
    let mut waived = Vec::new();

    for finding in findings {
        let is_waived = waivers.iter().any(|w| w.matches(finding.rule_id.as_str(), &finding.file, now));
        if is_waived {
            waived.push(finding);
        } else {
            active.push(finding);
        }
    }

    let mut severity_counts = SeverityCounts::default();
    for finding in &active {
        severity_counts.record(finding.severity);
    }

    let penalties = &scoring.penalties;
    let weights = scoring.confidence_weights();
    let cap = scoring.max_penalty_per_rule();

    let mut per_rule_penalty: HashMap<&'static str, f64> = HashMap::new();
    let mut total_penalty = 0.0;

    for finding in &active {
        let penalty = penalties.for_severity(finding.severity) * weights.for_confidence(finding.confidence);
        let rule_key = finding.rule_id.as_str();
        let entry = per_rule_penalty.entry(rule_key).or_insert(0.0);
        let remaining_room = (cap - *entry).max(0.0);
        let applied = penalty.min(remaining_room);
        *entry += applied;
        total_penalty += applied;
    }

    let raw_score = (scoring.start - total_penalty).max(0.0);
    let rounded_score = (raw_score + 0.5).floor();
    let status = ScanStatus::from_score(rounded_score);

    ScoredFindings {
        active,
        waived,
        severity_counts,
        score: rounded_score,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RuleId;
    use chrono::Utc;
    use endpointguard_core::{Confidence, Severity};

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn finding(rule_id: RuleId, severity: Severity, confidence: Confidence, file: &str) -> Finding {
        Finding {
            rule_id,
            severity,
            confidence,
            message: "test".to_string(),
            file: file.to_string(),
            line: None,
            column: None,
            end_line: None,
            end_column: None,
            snippet: None,
            evidence: Vec::new(),
            confidence_rationale: String::new(),
            remediation: Vec::new(),
            tags: Vec::new(),
        }
    }

    #[test]
    fn single_critical_high_confidence_penalty() {
        let findings = vec![finding(RuleId::AuthBoundaryMissing, Severity::Critical, Confidence::High, "a.ts")];
        let scored = score(findings, &[], &ScoringConfig::default(), today());
        assert_eq!(scored.score, 85.0);
        assert_eq!(scored.status, ScanStatus::Pass);
    }

    #[test]
    fn per_rule_penalty_is_capped() {
        let findings: Vec<Finding> = (0..10)
            .map(|i| finding(RuleId::AuthBoundaryMissing, Severity::Critical, Confidence::High, &format!("f{i}.ts")))
            .collect();
        let scored = score(findings, &[], &ScoringConfig::default(), today());
        assert_eq!(scored.score, 65.0);
    }

    #[test]
    fn score_floors_at_zero() {
        let findings: Vec<Finding> = (0..10)
            .flat_map(|i| {
                [
                    finding(RuleId::AuthBoundaryMissing, Severity::Critical, Confidence::High, &format!("a{i}.ts")),
                    finding(RuleId::RateLimitMissing, Severity::Critical, Confidence::High, &format!("b{i}.ts")),
                    finding(RuleId::TenancyScopeMissing, Severity::Critical, Confidence::High, &format!("c{i}.ts")),
                ]
            })
            .collect();
        let scored = score(findings, &[], &ScoringConfig::default(), today());
        assert!(scored.score >= 0.0);
    }

    #[test]
    fn waived_finding_is_excluded_from_score() {
        let findings = vec![finding(RuleId::AuthBoundaryMissing, Severity::Critical, Confidence::High, "a.ts")];
        let waivers = vec![Waiver {
            rule_id: "AUTH-BOUNDARY-MISSING".to_string(),
            file: "a.ts".to_string(),
            reason: "accepted risk".to_string(),
            expiry: None,
            created_at: Utc::now(),
        }];
        let scored = score(findings, &waivers, &ScoringConfig::default(), today());
        assert_eq!(scored.active.len(), 0);
        assert_eq!(scored.waived.len(), 1);
        assert_eq!(scored.score, 100.0);
    }
}
