//! INPUT-VALIDATION-MISSING (spec §4.8): mutation surfaces with no visible
//! schema-validation call.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use endpointguard_core::{Confidence, Severity};

use crate::model::{Endpoint, Finding, RuleId};

const PARSE_CALLER_BUILTINS: &[&str] =
    &["json", "url", "path", "date", "number", "bigint", "buffer", "querystring", "qs", "cookie", "cookiestore"];
const VALIDATE_CALLER_BUILTINS: &[&str] = &["url", "path"];

static ZOD_SCHEMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bz\.(object|string|number|boolean|array|enum|union)\s*\(").expect("static zod schema pattern"));
static PARSE_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+)\s*\.\s*parse\s*\(").expect("static parse-call pattern"));
static SAFE_PARSE_CALL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.safeParse\s*\(").expect("static safe-parse pattern"));
static VALIBOT_PARSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bv\.(parse|safeParse)\s*\(").expect("static valibot pattern"));
static VALIDATE_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+)\s*\.\s*validate\s*\(").expect("static validate-call pattern"));
static VALIDATE_SYNC_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.validateSync\s*\(").expect("static validate-sync pattern"));
static SAFE_ACTION_CLIENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"createSafeActionClient|actionClient").expect("static safe-action pattern"));
static TRPC_INPUT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.input\s*\(\s*z\.").expect("static trpc-input pattern"));
static CHAINED_PARSE_NO_CALLER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\)\s*\.\s*parse\s*\(").expect("static chained-parse pattern"));

static LINE_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"//.*$").expect("static line-comment pattern"));
static BLOCK_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("static block-comment pattern"));

static WEBHOOK_SIGNATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\w+\s*\.\s*webhooks\s*\.\s*constructEvent\s*\(").expect("static webhook-signature pattern")
});

static OUTBOUND_FETCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[^\w]|^)fetch\s*\(|axios\s*[.(]|got\s*[.(]|undici\.request\s*\(|https?\.(get|request)\s*\(")
        .expect("static outbound-fetch pattern")
});
static REQUEST_INFLUENCED_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"searchParams\.get\(|new URL\(req\.url|req\.url|req\.query|params\.")
        .expect("static request-influenced-url pattern")
});

fn strip_comments(text: &str) -> String {
    let without_block = BLOCK_COMMENT.replace_all(text, "");
    LINE_COMMENT.replace_all(&without_block, "").into_owned()
}

fn has_validation(stripped: &str) -> bool {
    if ZOD_SCHEMA.is_match(stripped) || SAFE_PARSE_CALL.is_match(stripped) || VALIBOT_PARSE.is_match(stripped) {
        return true;
    }
    if VALIDATE_SYNC_CALL.is_match(stripped) || SAFE_ACTION_CLIENT.is_match(stripped) || TRPC_INPUT.is_match(stripped) {
        return true;
    }
    if CHAINED_PARSE_NO_CALLER.is_match(stripped) {
        return true;
    }
    for caps in PARSE_CALL.captures_iter(stripped) {
        if !PARSE_CALLER_BUILTINS.contains(&caps[1].to_lowercase().as_str()) {
            return true;
        }
    }
    for caps in VALIDATE_CALL.captures_iter(stripped) {
        if !VALIDATE_CALLER_BUILTINS.contains(&caps[1].to_lowercase().as_str()) {
            return true;
        }
    }
    false
}

fn has_ssrf_shape(text: &str) -> bool {
    OUTBOUND_FETCH.is_match(text) && REQUEST_INFLUENCED_URL.is_match(text)
}

fn read_text(root: &Path, file: &str) -> String {
    std::fs::read_to_string(root.join(file)).unwrap_or_default()
}

pub fn run(root: &Path, endpoints: &[Endpoint], severity_cap: Option<Severity>) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut seen_action_files = std::collections::HashSet::new();

    for endpoint in endpoints {
        if !endpoint.is_mutation() {
            continue;
        }
        let (file, has_public_intent, db_write_evidence) = match endpoint {
            Endpoint::RouteHandler(r) => (r.file.clone(), r.public_intent.is_some(), r.signals.db_write_evidence),
            Endpoint::ServerAction(a) => {
                if !seen_action_files.insert(a.file.clone()) {
                    continue;
                }
                (a.file.clone(), false, a.signals.db_write_evidence)
            }
            Endpoint::RpcProcedure(_) => continue,
        };

        let text = read_text(root, &file);
        let stripped = strip_comments(&text);
        if has_validation(&stripped) {
            continue;
        }

        let webhook_verified = WEBHOOK_SIGNATURE.is_match(&text);
        let mut confidence = if db_write_evidence {
            Confidence::High
        } else if webhook_verified {
            Confidence::Med
        } else {
            Confidence::Med
        };
        let mut severity = Severity::High;

        let mut tags = vec!["validation".to_string()];
        if has_public_intent {
            if confidence == Confidence::Med {
                confidence = Confidence::High;
                severity = severity.bump();
            }
            if has_ssrf_shape(&text) {
                tags.push("ssrf-surface".to_string());
            }
        }

        if let Some(cap) = severity_cap {
            severity = severity.clamp_to(cap);
        }

        let mut evidence = vec!["no recognized schema-validation call found".to_string()];
        if webhook_verified {
            evidence.push("webhook signature verified, but payload shape is unvalidated".to_string());
        }
        if has_public_intent && has_ssrf_shape(&text) {
            evidence.push("outbound fetch with request-influenced URL".to_string());
        }

        findings.push(Finding {
            rule_id: RuleId::InputValidationMissing,
            severity,
            confidence,
            message: format!("{file} mutates state with no visible input validation"),
            file,
            line: None,
            column: None,
            end_line: None,
            end_column: None,
            snippet: None,
            evidence,
            confidence_rationale: if db_write_evidence {
                "write reaches the database with unvalidated input".to_string()
            } else {
                "mutation path with unvalidated input".to_string()
            },
            remediation: vec!["Validate the request body against a schema before using it.".to_string()],
            tags,
        });
    }

    findings
}
