//! AUTH-BOUNDARY-MISSING (spec §4.8): mutation surfaces with no proven
//! authentication boundary.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use endpointguard_core::{Confidence, Severity};

use crate::model::{Endpoint, Finding, RpcProcedureType, RuleId};

static PATHNAME_CALLBACK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/(callback|oauth|oidc|sso|scim)(/|$)").expect("static callback pattern"));

static HEADER_READ: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)headers?\s*(\.get\s*\(\s*["'])?(authorization|x-api-key|x-webhook-secret|x-signature|x-hub-signature)"#)
        .expect("static header-read pattern")
});
static HEADER_NEAR_SECRET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)headers?\.get\([^)]*\)[\s\S]{0,80}?(secret|token|key|signature)").expect("static header-secret pattern")
});
static AUTH_VAR_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(const|let|var)\s+(token|apiKey|signature|webhookSecret|headerValue)\b").expect("static auth-var pattern")
});
static ENV_SECRET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"process\.env\.\w*(SECRET|TOKEN|KEY|API_KEY|WEBHOOK)\w*").expect("static env-secret pattern")
});
static AUTHORIZATION_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)["'](authorization|bearer)["']"#).expect("static authorization literal"));
static VERIFY_FUNCTION_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(verify|validate|check)\w*(Token|Signature|Auth|Secret|Key)\s*\(").expect("static verify-call pattern")
});

static VERB_NOUN_GUARD_FN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(get|require|check|validate|verify|ensure|load|fetch|update)(User|Session|Auth|Account|Identity|Token)\s*\(")
        .expect("static verb-noun pattern")
});
static NULL_CHECK_GUARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"if\s*\(\s*!\s*\w+\s*\)[\s\S]{0,400}?(throw|return|redirect|\.json\s*\(|\.redirect\s*\()")
        .expect("static null-check guard pattern")
});

static WEBHOOK_SIGNATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\w+\s*\.\s*webhooks\s*\.\s*constructEvent\s*\(").expect("static webhook-signature pattern")
});
static FRAMEWORK_SERVE_WRAPPER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(serve|createHTTPHandler|fetchRequestHandler)\s*\(").expect("static serve-wrapper pattern"));
static TIMING_SAFE_WITH_REQUEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"timingSafeEqual\s*\([\s\S]{0,200}?(req|request|headers)[\s\S]{0,200}?(throw|401|403)")
        .expect("static timing-safe pattern")
});
static JWT_LIBRARY_USAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(jose|jsonwebtoken)\b[\s\S]{0,300}?(401|403|throw)").expect("static jwt-library pattern")
});
static TOKEN_TABLE_LOOKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.(apiKey|apiToken|accessToken|session)\.find\w*\([\s\S]{0,200}?(401|403|throw)")
        .expect("static token-table pattern")
});
static AUTH_GUARD_RETURN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(401|403)[\s\S]{0,200}?(throw|return)").expect("static auth-guard-return pattern")
});

fn has_auth_signal(text: &str) -> bool {
    HEADER_READ.is_match(text)
        || HEADER_NEAR_SECRET.is_match(text)
        || AUTH_VAR_DECL.is_match(text)
        || ENV_SECRET.is_match(text)
        || AUTHORIZATION_LITERAL.is_match(text)
        || VERIFY_FUNCTION_CALL.is_match(text)
}

fn has_inline_auth_guard(text: &str) -> bool {
    VERB_NOUN_GUARD_FN.is_match(text) && NULL_CHECK_GUARD.is_match(text)
}

/// Built-in patterns that suppress the rule outright even without a
/// resolved wrapper (spec §4.6, §4.8).
fn matches_builtin_auth_pattern(text: &str) -> bool {
    WEBHOOK_SIGNATURE.is_match(text)
        || FRAMEWORK_SERVE_WRAPPER.is_match(text)
        || TIMING_SAFE_WITH_REQUEST.is_match(text)
        || JWT_LIBRARY_USAGE.is_match(text)
        || TOKEN_TABLE_LOOKUP.is_match(text)
        || (AUTH_GUARD_RETURN.is_match(text) && has_auth_signal(text))
}

fn read_text(root: &Path, file: &str) -> String {
    std::fs::read_to_string(root.join(file)).unwrap_or_default()
}

/// Evaluate AUTH-BOUNDARY-MISSING over every mutation-capable endpoint,
/// deduplicating server actions by file (spec §4.8).
pub fn run(root: &Path, endpoints: &[Endpoint], severity_cap: Option<Severity>) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut seen_action_files = std::collections::HashSet::new();

    for endpoint in endpoints {
        if !endpoint.is_mutation() {
            continue;
        }

        match endpoint {
            Endpoint::RpcProcedure(p) if p.procedure_type == RpcProcedureType::Protected => continue,
            _ => {}
        }

        let file = endpoint.file().to_string();
        if let Endpoint::ServerAction(_) = endpoint {
            if !seen_action_files.insert(file.clone()) {
                continue;
            }
        }

        if let Endpoint::RouteHandler(route) = endpoint {
            if let Some(protection) = &route.protection {
                if protection.auth.satisfied {
                    continue;
                }
                if !protection.auth.unverified_wrappers.is_empty() {
                    continue;
                }
            }
        }

        let text = read_text(root, &file);
        if matches_builtin_auth_pattern(&text) {
            continue;
        }

        let pathname = match endpoint {
            Endpoint::RouteHandler(r) => r.pathname.clone(),
            _ => None,
        };
        let is_callback = pathname.as_deref().is_some_and(|p| PATHNAME_CALLBACK.is_match(p));

        let heuristic_hit = has_auth_signal(&text) || has_inline_auth_guard(&text);

        let (mut confidence, mut severity) = if heuristic_hit {
            (Confidence::Med, Severity::High)
        } else {
            (Confidence::High, Severity::Critical)
        };

        let mut tags = vec!["auth".to_string()];
        if is_callback {
            confidence = Confidence::Med;
            tags.push("callback".to_string());
            severity = severity.clamp_to(Severity::High);
        }

        if let Some(cap) = severity_cap {
            severity = severity.clamp_to(cap);
        }

        let is_webhook = pathname.as_deref().is_some_and(|p| p.to_lowercase().contains("webhook"));
        let (message, mut remediation) = if is_webhook {
            (
                format!("{file} handles a webhook with no verified auth boundary"),
                vec![
                    "Verify the webhook signature before processing the payload.".to_string(),
                    "Reject requests whose signature cannot be verified.".to_string(),
                ],
            )
        } else {
            (
                format!("{file} performs a mutation with no proven authentication boundary"),
                vec![
                    "Add a session or token check before the mutation runs.".to_string(),
                    "Fail closed: return 401/403 when the check fails.".to_string(),
                ],
            )
        };
        if is_callback {
            remediation.push("Confirm the provider validates state/nonce as part of the protocol.".to_string());
        }

        findings.push(Finding {
            rule_id: RuleId::AuthBoundaryMissing,
            severity,
            confidence,
            message,
            file,
            line: None,
            column: None,
            end_line: None,
            end_column: None,
            snippet: None,
            evidence: if heuristic_hit {
                vec!["possible custom auth pattern detected, enforcement not proven".to_string()]
            } else {
                vec!["no auth signal of any kind detected".to_string()]
            },
            confidence_rationale: if heuristic_hit {
                "auth-shaped code present but no resolvable enforcement".to_string()
            } else {
                "no auth signal detected anywhere in the file".to_string()
            },
            remediation,
            tags,
        });
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MutationSignals, RouteHandler};

    #[test]
    fn flags_unprotected_mutation_route() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("app/api/users")).unwrap();
        std::fs::write(
            dir.path().join("app/api/users/route.ts"),
            "export async function POST(req) { await db.user.create({ data: {} }); return Response.json({}); }",
        )
        .unwrap();

        let mut signals = MutationSignals::new();
        signals.mark_db_write("writes to user table");
        let route = RouteHandler {
            file: "app/api/users/route.ts".to_string(),
            methods: Some("POST".to_string()),
            pathname: Some("/api/users".to_string()),
            is_api: true,
            signals,
            public_intent: None,
            malformed_public_intent: None,
            protection: None,
        };
        let endpoints = vec![Endpoint::RouteHandler(route)];
        let findings = run(dir.path(), &endpoints, None);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
    }

    #[test]
    fn callback_pathname_downgrades_to_med_confidence() {
        assert!(PATHNAME_CALLBACK.is_match("/api/auth/callback/github"));
    }
}
