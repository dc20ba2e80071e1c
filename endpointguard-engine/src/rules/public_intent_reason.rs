//! PUBLIC-INTENT-MISSING-REASON (spec §4.8): a malformed public-intent
//! directive (missing or empty reason).

use endpointguard_core::{Confidence, Severity};

use crate::model::{Endpoint, Finding, RuleId};

pub fn run(endpoints: &[Endpoint], severity_cap: Option<Severity>) -> Vec<Finding> {
    let mut findings = Vec::new();

    for endpoint in endpoints {
        let Endpoint::RouteHandler(route) = endpoint else {
            continue;
        };
        let Some(malformed) = &route.malformed_public_intent else {
            continue;
        };

        let mut severity = Severity::Med;
        if let Some(cap) = severity_cap {
            severity = severity.clamp_to(cap);
        }

        findings.push(Finding {
            rule_id: RuleId::PublicIntentMissingReason,
            severity,
            confidence: Confidence::High,
            message: format!("{} has a public-intent directive with no reason", route.file),
            file: route.file.clone(),
            line: Some(malformed.line),
            column: None,
            end_line: None,
            end_column: None,
            snippet: Some(malformed.raw_text.clone()),
            evidence: vec!["directive present but reason attribute is missing or empty".to_string()],
            confidence_rationale: "the directive line itself is the evidence".to_string(),
            remediation: vec!["Add a non-empty reason=\"...\" attribute to the public-intent directive.".to_string()],
            tags: vec!["public-intent".to_string()],
        });
    }

    findings
}
