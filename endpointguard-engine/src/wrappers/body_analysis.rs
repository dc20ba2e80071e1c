//! Phase C — wrapper body analysis (spec §4.6): distinguishes "calls an
//! auth function" from "enforces auth on failure" over a located function
//! scope, with a handful of patterns searched against the *full* source.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::WrapperEvidence;
use crate::parsers::{locate_symbol_body, ParseResult};

const RATE_LIMIT_PACKAGE_IMPORTS: &[(&str, &str)] = &[
    ("@upstash/ratelimit", "imports @upstash/ratelimit"),
    ("@arcjet/next", "imports @arcjet/next"),
    ("@unkey/ratelimit", "imports @unkey/ratelimit"),
];

/// Built-in auth patterns that imply enforcement outright, not merely
/// presence (spec §4.6).
static BUILTIN_ENFORCING_AUTH: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"\b\w+\s*\.\s*auth\s*\.\s*getUser\s*\(").unwrap(), "calls <db>.auth.getUser()"),
        (Regex::new(r"\b\w+\s*\.\s*auth\s*\.\s*getSession\s*\(").unwrap(), "calls <db>.auth.getSession()"),
        (
            Regex::new(r"\b\w+\s*\.\s*webhooks\s*\.\s*constructEvent\s*\(").unwrap(),
            "verifies payment webhook signature",
        ),
        (Regex::new(r"\bverifyVercelSignature\s*\(").unwrap(), "calls verifyVercelSignature()"),
        (Regex::new(r"\bverifyQstashSignature\s*\(").unwrap(), "calls verifyQstashSignature()"),
    ]
});

static HMAC_WITH_SIGNATURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)createHmac\s*\([^)]*\).*signature").unwrap());
static TIMING_SAFE_EQUAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\btimingSafeEqual\s*\(").unwrap());

static AUTH_ENFORCED_GUARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"if\s*\(\s*!\s*\(?\s*(session|user|token|currentUser|auth)\b[^)]*\)[\s\S]{0,120}?(throw|return|NextResponse\.redirect|\.json\s*\(|new\s+Response)",
    )
    .unwrap()
});
static AUTH_NULLISH_THROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(session|user|token|auth)\s*(\?\?|\|\|)\s*(throw|null)").unwrap()
});
static AUTH_CALL_FOLLOWED_BY_CHECK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+\s*\([^)]*\)[\s\S]{0,200}?if\s*\(\s*!").unwrap());

static RATE_LIMIT_ENFORCED_SUCCESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"if\s*\(\s*!\s*success[\s\S]{0,120}?(throw|return|429|too many)").unwrap()
});
static RATE_LIMIT_ENFORCED_REMAINING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"if\s*\(\s*remaining\s*<=?\s*0[\s\S]{0,120}?(throw|return|429|too many)").unwrap()
});
static RATE_LIMIT_DESTRUCTURE_SUCCESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\s*success\s*\}[\s\S]{0,120}?!\s*success").unwrap());
static RATE_LIMIT_LIMIT_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.limit\s*\([\s\S]{0,200}?(throw|return new Response|429)").unwrap()
});

/// Analyze the located body of `symbol` for auth/rate-limit evidence.
/// `full_source` is searched separately for file-level import markers that
/// apply regardless of which scope they appear in.
pub fn analyze_body(
    parsed: &ParseResult,
    symbol: &str,
    full_source: &str,
    auth_function_names: &[String],
    rate_limit_wrapper_names: &[String],
) -> WrapperEvidence {
    let mut evidence = WrapperEvidence::default();
    let body = locate_symbol_body(parsed, symbol);
    let scope_text = body.text;

    for (package, detail) in RATE_LIMIT_PACKAGE_IMPORTS {
        if full_source.contains(package) {
            evidence.set_rate_limit_call(*detail);
        }
    }

    for name in auth_function_names {
        let pattern = format!(r"\b{}\s*\(", regex::escape(name));
        if let Ok(re) = Regex::new(&pattern) {
            if re.is_match(scope_text) {
                evidence.set_auth_call(format!("calls {name}()"));
            }
        }
    }

    for (re, detail) in BUILTIN_ENFORCING_AUTH.iter() {
        if re.is_match(scope_text) {
            evidence.set_auth_enforced(*detail);
        }
    }
    if HMAC_WITH_SIGNATURE.is_match(scope_text) && TIMING_SAFE_EQUAL.is_match(scope_text) {
        evidence.set_auth_enforced("HMAC signature comparison via timingSafeEqual");
    }

    for name in rate_limit_wrapper_names {
        let pattern = format!(r"\b{}[.(]", regex::escape(name));
        if let Ok(re) = Regex::new(&pattern) {
            if re.is_match(scope_text) {
                evidence.set_rate_limit_call(format!("calls rate-limit wrapper {name}"));
            }
        }
    }

    if !evidence.auth_enforced {
        if AUTH_ENFORCED_GUARD.is_match(scope_text)
            || AUTH_NULLISH_THROW.is_match(scope_text)
            || (evidence.auth_call_present && AUTH_CALL_FOLLOWED_BY_CHECK.is_match(scope_text))
        {
            evidence.set_auth_enforced("fail-closed guard on auth result");
        }
    }

    if !evidence.rate_limit_enforced {
        if RATE_LIMIT_ENFORCED_SUCCESS.is_match(scope_text)
            || RATE_LIMIT_ENFORCED_REMAINING.is_match(scope_text)
            || RATE_LIMIT_DESTRUCTURE_SUCCESS.is_match(scope_text)
            || RATE_LIMIT_LIMIT_CALL.is_match(scope_text)
        {
            evidence.set_rate_limit_enforced("fail-closed guard on rate-limit result");
        }
    }

    evidence
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::TypeScriptParser;

    fn parse(source: &str) -> ParseResult {
        TypeScriptParser::new().unwrap().parse(source)
    }

    #[test]
    fn detects_enforced_auth_guard() {
        let source = r#"
export const withWorkspace = (handler) => async (req) => {
  const session = await getSession();
  if (!session) {
    return new Response("Unauthorized", { status: 401 });
  }
  return handler(req);
};
"#;
        let parsed = parse(source);
        let evidence = analyze_body(&parsed, "withWorkspace", source, &["getSession".to_string()], &[]);
        assert!(evidence.auth_call_present);
        assert!(evidence.auth_enforced);
    }

    #[test]
    fn detects_call_without_enforcement() {
        let source = r#"
export const withLogging = (handler) => async (req) => {
  const session = await getSession();
  console.log(session);
  return handler(req);
};
"#;
        let parsed = parse(source);
        let evidence = analyze_body(&parsed, "withLogging", source, &["getSession".to_string()], &[]);
        assert!(evidence.auth_call_present);
        assert!(!evidence.auth_enforced);
    }

    #[test]
    fn rate_limit_package_import_sets_presence_from_full_source() {
        let source = "import { Ratelimit } from \"@upstash/ratelimit\";\nexport const withRL = (h) => h;\n";
        let parsed = parse(source);
        let evidence = analyze_body(&parsed, "withRL", source, &[], &[]);
        assert!(evidence.rate_limit_call_present);
    }

    #[test]
    fn invariant_enforced_implies_call_present() {
        let source = r#"
export const withAuth = (handler) => async (req) => {
  db.auth.getUser();
  return handler(req);
};
"#;
        let parsed = parse(source);
        let evidence = analyze_body(&parsed, "withAuth", source, &[], &[]);
        assert!(evidence.auth_enforced);
        assert!(evidence.auth_call_present);
    }
}
