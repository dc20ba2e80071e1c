//! WRAPPER-UNRECOGNIZED (spec §4.8): one finding per wrapper whose
//! auth-or-rate-limit enforcement could not be proven, and which wraps at
//! least one route that would otherwise have triggered AUTH-BOUNDARY-MISSING
//! or RATE-LIMIT-MISSING.

use std::collections::HashMap;

use endpointguard_core::{Confidence, Severity};

use crate::model::{Endpoint, Finding, RuleId, WrapperIndex};

const SAMPLE_SIZE: usize = 5;

fn classify_status(evidence: &crate::model::WrapperEvidence, resolved: bool) -> &'static str {
    if !resolved {
        "unresolved"
    } else if evidence.auth_call_present && !evidence.auth_enforced {
        "calls-auth-but-enforcement-not-proven"
    } else if evidence.rate_limit_call_present && !evidence.rate_limit_enforced {
        "calls-rl-but-enforcement-not-proven"
    } else {
        "resolved-with-no-evidence"
    }
}

fn is_unverified(wrapper: &crate::model::WrapperAnalysis) -> bool {
    !wrapper.resolved || (!wrapper.evidence.auth_enforced && !wrapper.evidence.rate_limit_enforced)
}

/// Whether at least one of `wrapper`'s wrapped routes would otherwise have
/// triggered AUTH-BOUNDARY-MISSING or RATE-LIMIT-MISSING: the route defers
/// to this wrapper on the relevant facet and is mutation-capable (auth) or
/// an API surface (rate limit).
fn wraps_route_that_would_otherwise_fire(wrapper: &crate::model::WrapperAnalysis, endpoints: &[Endpoint]) -> bool {
    let prefix = format!("{}:", wrapper.name);
    let route_by_file: HashMap<&str, &crate::model::RouteHandler> = endpoints
        .iter()
        .filter_map(|e| match e {
            Endpoint::RouteHandler(route) => Some((route.file.as_str(), route)),
            _ => None,
        })
        .collect();

    wrapper.usage_files.iter().any(|file| {
        let Some(route) = route_by_file.get(file.as_str()) else {
            return false;
        };
        let Some(protection) = &route.protection else {
            return false;
        };
        let auth_would_fire =
            route.signals.mutation_evidence && protection.auth.unverified_wrappers.iter().any(|d| d.starts_with(&prefix));
        let rate_limit_would_fire =
            route.is_api && protection.rate_limit.unverified_wrappers.iter().any(|d| d.starts_with(&prefix));
        auth_would_fire || rate_limit_would_fire
    })
}

pub fn run(wrapper_index: &WrapperIndex, endpoints: &[Endpoint], severity_cap: Option<Severity>) -> Vec<Finding> {
    let mut findings = Vec::new();

    for wrapper in wrapper_index.values() {
        if !is_unverified(wrapper) {
            continue;
        }
        if wrapper.usage_count == 0 {
            continue;
        }
        if !wraps_route_that_would_otherwise_fire(wrapper, endpoints) {
            continue;
        }

        let status = classify_status(&wrapper.evidence, wrapper.resolved);
        let mut severity = if wrapper.mutation_route_count > 0 { Severity::High } else { Severity::Med };
        if let Some(cap) = severity_cap {
            severity = severity.clamp_to(cap);
        }

        let mut evidence = vec![format!(
            "wraps {} route(s), {} of which are mutation routes",
            wrapper.usage_count, wrapper.mutation_route_count
        )];
        let sample: Vec<&String> = wrapper.usage_files.iter().take(SAMPLE_SIZE).collect();
        if !sample.is_empty() {
            evidence.push(format!("sample routes: {}", sample.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")));
        }
        evidence.extend(wrapper.evidence.auth_details.iter().cloned());
        evidence.extend(wrapper.evidence.rate_limit_details.iter().cloned());

        findings.push(Finding {
            rule_id: RuleId::WrapperUnrecognized,
            severity,
            confidence: Confidence::High,
            message: format!("wrapper `{}` is {status} across {} route(s)", wrapper.name, wrapper.usage_count),
            file: wrapper.definition_file.clone().unwrap_or_else(|| wrapper.name.clone()),
            line: None,
            column: None,
            end_line: None,
            end_column: None,
            snippet: None,
            evidence,
            confidence_rationale: "usage is certain; only the enforcement proof is missing".to_string(),
            remediation: vec![format!(
                "Confirm that `{}` enforces auth and/or rate limiting on failure, or inline the check at each call site.",
                wrapper.name
            )],
            tags: vec!["wrapper".to_string(), status.to_string()],
        });
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MutationSignals, ProtectionStatus, ProtectionSummary, RouteHandler, WrapperAnalysis};

    fn route_deferring_to(wrapper_name: &str, mutation: bool) -> RouteHandler {
        let mut signals = MutationSignals::new();
        if mutation {
            signals.mark_db_write("writes to table");
        }
        let mut auth = ProtectionStatus::default();
        auth.defer_to_wrapper(format!("{wrapper_name}: unresolved"));
        RouteHandler {
            file: "app/api/a/route.ts".to_string(),
            methods: Some("POST".to_string()),
            pathname: Some("/api/a".to_string()),
            is_api: true,
            signals,
            public_intent: None,
            malformed_public_intent: None,
            protection: Some(ProtectionSummary { auth, rate_limit: ProtectionStatus::default() }),
        }
    }

    #[test]
    fn classifies_unresolved_wrapper() {
        let mut w = WrapperAnalysis::unresolved("withCustom");
        w.usage_count = 2;
        w.usage_files.push("app/api/a/route.ts".to_string());
        w.mutation_route_count = 1;

        let mut index = WrapperIndex::new();
        index.insert("withCustom".to_string(), w);
        let endpoints = vec![Endpoint::RouteHandler(route_deferring_to("withCustom", true))];
        let findings = run(&index, &endpoints, None);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
        assert!(findings[0].tags.contains(&"unresolved".to_string()));
    }

    #[test]
    fn skips_wrappers_with_zero_usage() {
        let index: WrapperIndex = [("unused".to_string(), WrapperAnalysis::unresolved("unused"))].into_iter().collect();
        let findings = run(&index, &[], None);
        assert!(findings.is_empty());
    }

    #[test]
    fn skips_wrapper_whose_routes_are_already_protected() {
        let mut w = WrapperAnalysis::unresolved("withCustom");
        w.usage_count = 1;
        w.usage_files.push("app/api/a/route.ts".to_string());

        let mut index = WrapperIndex::new();
        index.insert("withCustom".to_string(), w);

        let mut route = route_deferring_to("withCustom", true);
        route.protection = Some(ProtectionSummary::default());
        let endpoints = vec![Endpoint::RouteHandler(route)];
        let findings = run(&index, &endpoints, None);
        assert!(findings.is_empty());
    }
}
