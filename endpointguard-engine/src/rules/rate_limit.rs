//! RATE-LIMIT-MISSING (spec §4.8): API surfaces and RPC mutations with no
//! proven rate limit.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use endpointguard_core::{Confidence, Severity};

use crate::model::{Endpoint, Finding, RpcProcedureType, RuleId};

static EXEMPT_PATHNAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(/health$|/ping$|/ready$|/live$|/_next/|/cron/|/tasks/|webhook|/auth/\[\.\.\.|callback(/|$)|/oauth/|/saml/|/og(/|$))")
        .expect("static rate-limit exemption pattern")
});

static CRON_KEY_AUTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(CRON_API_KEY|CRON_SECRET)\b|verifyVercelSignature\s*\(").expect("static cron-key pattern")
});
static WEBHOOK_SIGNATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\w+\s*\.\s*webhooks\s*\.\s*constructEvent\s*\(").expect("static webhook-signature pattern")
});

static LOGIN_PATHNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(/login|/signin|/sign-in|/auth/login|/auth/signin)").expect("static login pattern"));

static FORM_DATA_READ: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(request|req)\.(formData)\s*\(|req\.body").expect("static form-data pattern"));
static PUT_CALL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.put\s*\(").expect("static put-call pattern"));

static OUTBOUND_FETCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[^\w]|^)fetch\s*\(|axios\s*[.(]|got\s*[.(]|undici\.request\s*\(|https?\.(get|request)\s*\(")
        .expect("static outbound-fetch pattern")
});
static REQUEST_INFLUENCED_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"searchParams\.get\(|new URL\(req\.url|req\.url|req\.query|params\.")
        .expect("static request-influenced-url pattern")
});

static RPC_RATE_LIMIT_GENERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\w*(rateLimit|ratelimit|rate_limit)\w*\s*\(").expect("static rpc rate-limit pattern")
});

fn is_exempt(pathname: Option<&str>, is_trpc_proxy: bool) -> bool {
    if is_trpc_proxy {
        return true;
    }
    pathname.is_some_and(|p| EXEMPT_PATHNAME.is_match(p))
}

fn read_text(root: &Path, file: &str) -> String {
    std::fs::read_to_string(root.join(file)).unwrap_or_default()
}

fn has_ssrf_shape(text: &str) -> bool {
    OUTBOUND_FETCH.is_match(text) && REQUEST_INFLUENCED_URL.is_match(text)
}

pub fn run(root: &Path, endpoints: &[Endpoint], trpc_proxy_file: Option<&str>, severity_cap: Option<Severity>) -> Vec<Finding> {
    let mut findings = Vec::new();

    for endpoint in endpoints {
        let (file, pathname, is_get_only, has_body_read, has_public_intent) = match endpoint {
            Endpoint::RouteHandler(r) => {
                if !r.is_api {
                    continue;
                }
                let get_only = r.methods.as_deref() == Some("GET");
                (r.file.clone(), r.pathname.clone(), get_only, r.signals.body_read, r.public_intent.is_some())
            }
            Endpoint::RpcProcedure(p) => {
                if p.procedure_kind != crate::model::RpcProcedureKind::Mutation {
                    continue;
                }
                (p.file.clone(), None, false, false, false)
            }
            Endpoint::ServerAction(_) => continue,
        };

        let is_trpc_proxy = trpc_proxy_file.is_some_and(|p| p == file);
        if is_exempt(pathname.as_deref(), is_trpc_proxy) {
            continue;
        }

        let text = read_text(root, &file);
        if WEBHOOK_SIGNATURE.is_match(&text) || CRON_KEY_AUTH.is_match(&text) {
            continue;
        }

        if let Endpoint::RouteHandler(r) = endpoint {
            if let Some(protection) = &r.protection {
                if protection.rate_limit.satisfied {
                    continue;
                }
                if !protection.rate_limit.unverified_wrappers.is_empty() {
                    continue;
                }
                if protection.auth.is_strong() {
                    continue;
                }
            }
        }

        if let Endpoint::RpcProcedure(p) = endpoint {
            let has_rl = text.contains("@upstash/ratelimit")
                || text.contains("rate-limiter-flexible")
                || text.contains("@arcjet/next")
                || text.contains("@unkey/ratelimit")
                || RPC_RATE_LIMIT_GENERAL.is_match(&text);
            if has_rl {
                continue;
            }
            let severity = match p.procedure_type {
                RpcProcedureType::Protected => Severity::High,
                _ => Severity::Med,
            };
            let severity = severity_cap.map(|c| severity.clamp_to(c)).unwrap_or(severity);
            findings.push(Finding {
                rule_id: RuleId::RateLimitMissing,
                severity,
                confidence: Confidence::Med,
                message: format!("RPC procedure {} has no rate-limit call", p.name),
                file: file.clone(),
                line: Some(p.line),
                column: None,
                end_line: None,
                end_column: None,
                snippet: None,
                evidence: vec!["no rate-limit wrapper or package call found in the file".to_string()],
                confidence_rationale: "lexical absence of any recognized rate-limit call".to_string(),
                remediation: vec!["Wrap the procedure with a rate limiter before it reaches the resolver.".to_string()],
                tags: vec!["rate-limit".to_string(), "rpc".to_string()],
            });
            continue;
        }

        let (mut severity, mut confidence) = if let Endpoint::RouteHandler(r) = endpoint {
            if r.signals.mutation_evidence {
                (Severity::Critical, Confidence::High)
            } else if has_body_read {
                (Severity::High, Confidence::High)
            } else if is_get_only {
                (Severity::Med, Confidence::Med)
            } else {
                (Severity::Med, Confidence::Med)
            }
        } else {
            (Severity::Med, Confidence::Med)
        };

        let mut tags = vec!["rate-limit".to_string()];

        if pathname.as_deref().is_some_and(|p| LOGIN_PATHNAME.is_match(p)) {
            severity = Severity::Critical;
            confidence = Confidence::High;
            tags.push("login".to_string());
        }
        if FORM_DATA_READ.is_match(&text) && PUT_CALL.is_match(&text) {
            severity = Severity::Critical;
            confidence = Confidence::High;
            tags.push("public-upload".to_string());
        }
        if has_public_intent {
            severity = severity.max(Severity::High);
            if has_ssrf_shape(&text) {
                severity = Severity::Critical;
                confidence = Confidence::High;
                tags.push("ssrf-surface".to_string());
                tags.push("outbound-fetch".to_string());
            }
        }

        if let Some(cap) = severity_cap {
            severity = severity.clamp_to(cap);
        }

        findings.push(Finding {
            rule_id: RuleId::RateLimitMissing,
            severity,
            confidence,
            message: format!("{file} has no proven rate limit"),
            file: file.clone(),
            line: None,
            column: None,
            end_line: None,
            end_column: None,
            snippet: None,
            evidence: vec!["no direct call, wrapper, or middleware coverage found".to_string()],
            confidence_rationale: "lexical absence of any recognized rate-limit mechanism".to_string(),
            remediation: vec!["Apply a rate limiter (e.g. token-bucket or sliding-window) before the handler body runs.".to_string()],
            tags,
        });
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exempts_health_check_pathname() {
        assert!(is_exempt(Some("/api/health"), false));
        assert!(!is_exempt(Some("/api/users"), false));
    }

    #[test]
    fn detects_outbound_ssrf_shape() {
        let text = r#"const url = req.url; await fetch(url);"#;
        assert!(has_ssrf_shape(text));
    }
}
