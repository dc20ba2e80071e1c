//! Protection computer (spec §4.7): decides, once per route, whether auth
//! and rate-limiting are satisfied and how strongly.

use std::sync::LazyLock;

use regex::Regex;

use endpointguard_core::config::HintsConfig;

use crate::middleware::MiddlewareAnalysis;
use crate::model::{ProtectionSource, ProtectionStatus, ProtectionSummary, RouteHandler, WrapperIndex};
use crate::wrappers::extract_chains;

const RATE_LIMIT_PACKAGE_MARKERS: &[&str] =
    &["@upstash/ratelimit", "rate-limiter-flexible", "@arcjet/next", "@unkey/ratelimit"];

static RATE_LIMIT_METHOD_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bratelimit\s*\.\s*limit\s*\(").expect("static rate-limit method pattern"));

static RATE_LIMIT_GENERAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\w*(rateLimit|ratelimit|rate_limit)\w*\s*\(").expect("static general rate-limit pattern")
});

fn direct_call_pattern(name: &str) -> Option<Regex> {
    Regex::new(&format!(r"\b{}\s*\(", regex::escape(name))).ok()
}

/// Compute the auth/rate-limit protection summary for a single route,
/// given its own source text, the shared wrapper index, and the project's
/// middleware analysis. Written exactly once per route, before rules run.
pub fn compute(
    route: &RouteHandler,
    route_text: &str,
    wrapper_index: &WrapperIndex,
    middleware: &MiddlewareAnalysis,
    hints: &HintsConfig,
) -> ProtectionSummary {
    let chain = route_chain_for(route, route_text);

    let auth = compute_auth(route, route_text, &chain, wrapper_index, middleware, hints);
    let rate_limit = compute_rate_limit(route, route_text, &chain, wrapper_index, middleware, hints);

    ProtectionSummary { auth, rate_limit }
}

/// The ordered wrapper chain for this route's export — the method it
/// declares, or the default export when it has none.
fn route_chain_for(route: &RouteHandler, route_text: &str) -> Vec<String> {
    let chains = extract_chains(route_text);
    let method = route.methods.as_deref().and_then(|m| m.split(',').next());
    chains
        .into_iter()
        .find(|c| match method {
            Some(m) => c.method.as_deref() == Some(m),
            None => c.method.is_none(),
        })
        .map(|c| c.chain)
        .unwrap_or_default()
}

fn compute_auth(
    route: &RouteHandler,
    route_text: &str,
    chain: &[String],
    wrapper_index: &WrapperIndex,
    middleware: &MiddlewareAnalysis,
    hints: &HintsConfig,
) -> ProtectionStatus {
    let mut status = ProtectionStatus::default();

    for name in &hints.auth.functions {
        if let Some(re) = direct_call_pattern(name) {
            if re.is_match(route_text) {
                status.satisfy(ProtectionSource::Direct, true, format!("directly calls {name}()"));
                return status;
            }
        }
    }

    if chain.iter().any(|w| hints.auth.functions.contains(w)) {
        let wrapper = chain.iter().find(|w| hints.auth.functions.contains(*w)).expect("just matched");
        status.satisfy(ProtectionSource::Hint, true, format!("wrapped by hint-listed auth function {wrapper}"));
        return status;
    }

    for name in chain {
        let Some(wrapper) = wrapper_index.get(name) else {
            status.defer_to_wrapper(format!("{name}: unresolved"));
            continue;
        };
        if wrapper.resolved && wrapper.evidence.auth_enforced {
            status.satisfy(ProtectionSource::Wrapper, true, format!("wrapped by {name}, which enforces auth"));
            return status;
        }
        if !wrapper.resolved {
            status.defer_to_wrapper(format!("{name}: unresolved"));
        } else if !wrapper.evidence.auth_call_present {
            status.defer_to_wrapper(format!("{name}: resolved, no auth evidence"));
        } else {
            status.defer_to_wrapper(format!("{name}: calls auth but enforcement not proven"));
        }
    }
    if !status.unverified_wrappers.is_empty() {
        return status;
    }

    if middleware.auth_likely {
        let pathname = route.pathname.as_deref().unwrap_or("");
        if middleware.covers(pathname) {
            status.satisfy(ProtectionSource::Middleware, true, "covered by auth-likely middleware matcher");
        }
    }

    status
}

fn rate_limit_direct_hit(route_text: &str, hints: &HintsConfig) -> Option<String> {
    for name in &hints.rate_limit.wrappers {
        if let Some(re) = direct_call_pattern(name) {
            if re.is_match(route_text) {
                return Some(format!("directly calls rate-limit wrapper {name}()"));
            }
        }
    }
    for package in RATE_LIMIT_PACKAGE_MARKERS {
        if route_text.contains(package) {
            return Some(format!("imports {package}"));
        }
    }
    if RATE_LIMIT_METHOD_CALL.is_match(route_text) {
        return Some("calls ratelimit.limit()".to_string());
    }
    if RATE_LIMIT_GENERAL_PATTERN.is_match(route_text) {
        return Some("matches general rate-limit call pattern".to_string());
    }
    None
}

fn compute_rate_limit(
    route: &RouteHandler,
    route_text: &str,
    chain: &[String],
    wrapper_index: &WrapperIndex,
    middleware: &MiddlewareAnalysis,
    hints: &HintsConfig,
) -> ProtectionStatus {
    let mut status = ProtectionStatus::default();

    if let Some(detail) = rate_limit_direct_hit(route_text, hints) {
        status.satisfy(ProtectionSource::Direct, true, detail);
        return status;
    }

    if chain.iter().any(|w| hints.rate_limit.wrappers.contains(w)) {
        let wrapper = chain.iter().find(|w| hints.rate_limit.wrappers.contains(*w)).expect("just matched");
        status.satisfy(ProtectionSource::Hint, true, format!("wrapped by hint-listed rate-limit wrapper {wrapper}"));
        return status;
    }

    for name in chain {
        let Some(wrapper) = wrapper_index.get(name) else {
            status.defer_to_wrapper(format!("{name}: unresolved"));
            continue;
        };
        if wrapper.resolved && wrapper.evidence.rate_limit_enforced {
            status.satisfy(ProtectionSource::Wrapper, true, format!("wrapped by {name}, which enforces rate limiting"));
            return status;
        }
        if !wrapper.resolved {
            status.defer_to_wrapper(format!("{name}: unresolved"));
        } else if !wrapper.evidence.rate_limit_call_present {
            status.defer_to_wrapper(format!("{name}: resolved, no rate-limit evidence"));
        } else {
            status.defer_to_wrapper(format!("{name}: calls rate-limit but enforcement not proven"));
        }
    }
    if !status.unverified_wrappers.is_empty() {
        return status;
    }

    if middleware.rate_limit_likely {
        let pathname = route.pathname.as_deref().unwrap_or("");
        if middleware.covers(pathname) {
            status.satisfy(ProtectionSource::Middleware, true, "covered by rate-limit-likely middleware matcher");
        }
    }

    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MutationSignals, RouteHandler};

    fn route(methods: Option<&str>, pathname: &str) -> RouteHandler {
        RouteHandler {
            file: "app/api/widgets/route.ts".to_string(),
            methods: methods.map(|s| s.to_string()),
            pathname: Some(pathname.to_string()),
            is_api: true,
            signals: MutationSignals::new(),
            public_intent: None,
            malformed_public_intent: None,
            protection: None,
        }
    }

    #[test]
    fn direct_auth_call_satisfies() {
        let hints = HintsConfig {
            auth: endpointguard_core::config::AuthHints {
                functions: vec!["getSession".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        let text = "export async function POST(req) { const s = await getSession(); return Response.json({}); }";
        let r = route(Some("POST"), "/api/widgets");
        let index = WrapperIndex::new();
        let middleware = MiddlewareAnalysis::default();
        let summary = compute(&r, text, &index, &middleware, &hints);
        assert!(summary.auth.is_strong());
        assert_eq!(summary.auth.sources, vec![ProtectionSource::Direct]);
    }

    #[test]
    fn unresolved_wrapper_defers_rather_than_satisfies() {
        let hints = HintsConfig::default();
        let text = "export const POST = withCustom(handler);";
        let r = route(Some("POST"), "/api/widgets");
        let index = WrapperIndex::new();
        let middleware = MiddlewareAnalysis::default();
        let summary = compute(&r, text, &index, &middleware, &hints);
        assert!(!summary.auth.satisfied);
        assert!(!summary.auth.unverified_wrappers.is_empty());
    }

    #[test]
    fn no_matchers_middleware_covers_and_satisfies() {
        let hints = HintsConfig::default();
        let text = "export async function GET(req) { return Response.json({}); }";
        let r = route(Some("GET"), "/api/widgets");
        let index = WrapperIndex::new();
        let middleware = MiddlewareAnalysis {
            auth_likely: true,
            ..Default::default()
        };
        let summary = compute(&r, text, &index, &middleware, &hints);
        assert!(summary.auth.is_strong());
        assert_eq!(summary.auth.sources, vec![ProtectionSource::Middleware]);
    }
}
