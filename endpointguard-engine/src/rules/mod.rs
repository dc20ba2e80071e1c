//! Rule engine (spec §4.8): evaluates the five rules over the populated
//! index and returns all findings, deterministically ordered.

mod auth_boundary;
mod input_validation;
mod public_intent_reason;
mod rate_limit;
mod tenancy_scope;
mod wrapper_unrecognized;

use std::path::Path;

use endpointguard_core::config::{Config, HintsConfig};

use crate::model::{sort_findings, DependencyBitmap, Endpoint, Finding, RuleId, WrapperIndex};

fn severity_cap(config: &Config, rule_id: RuleId) -> Option<endpointguard_core::Severity> {
    config.rules.get(rule_id.as_str()).map(|r| r.severity)
}

/// Run all five rules and return findings sorted by `(ruleId, file, line, column)`.
///
/// `hints` is the scanner-derived hint set (ecosystem defaults merged with
/// the user's own), not the raw `config.hints` — the tenancy check needs the
/// default org-field names the same way the protection computer needs the
/// default auth functions (spec §4.2).
pub fn run_all(
    root: &Path,
    endpoints: &[Endpoint],
    wrapper_index: &WrapperIndex,
    bitmap: &DependencyBitmap,
    config: &Config,
    hints: &HintsConfig,
) -> Vec<Finding> {
    let trpc_proxy_file = crate::endpoints::rpc::find_proxy_route(root)
        .map(|p| p.strip_prefix(root).unwrap_or(&p).to_string_lossy().replace('\\', "/"));

    let mut findings = Vec::new();
    findings.extend(auth_boundary::run(root, endpoints, severity_cap(config, RuleId::AuthBoundaryMissing)));
    findings.extend(rate_limit::run(
        root,
        endpoints,
        trpc_proxy_file.as_deref(),
        severity_cap(config, RuleId::RateLimitMissing),
    ));
    findings.extend(tenancy_scope::run(
        root,
        bitmap,
        &config.include,
        &hints.tenancy.org_field_names,
        severity_cap(config, RuleId::TenancyScopeMissing),
    ));
    findings.extend(input_validation::run(root, endpoints, severity_cap(config, RuleId::InputValidationMissing)));
    findings.extend(wrapper_unrecognized::run(
        wrapper_index,
        endpoints,
        severity_cap(config, RuleId::WrapperUnrecognized),
    ));
    findings.extend(public_intent_reason::run(endpoints, severity_cap(config, RuleId::PublicIntentMissingReason)));

    sort_findings(&mut findings);
    findings
}
