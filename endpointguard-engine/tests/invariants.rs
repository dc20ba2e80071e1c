//! Universal invariants that must hold for every scan, independent of any
//! one rule's specifics: determinism, monotonic severity caps, waiver
//! exclusion from scoring, and the few cross-cutting guarantees the rule
//! engine and scoring model both lean on.

use std::path::Path;

use chrono::Utc;

use endpointguard_core::config::{Config, RuleConfig};
use endpointguard_core::waiver::Waiver;
use endpointguard_core::Severity;
use endpointguard_engine::{Engine, ScanOptions};

fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn unprotected_mutation_project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("package.json"), r#"{"dependencies":{"next":"14.0.0"}}"#).unwrap();
    write_file(
        dir.path(),
        "app/api/users/route.ts",
        r#"export async function POST(req) {
  const raw = await req.json();
  await db.user.create({ data: raw });
  return Response.json({ ok: true });
}
"#,
    );
    dir
}

/// 1. Scanning the same project twice with the same config produces
/// byte-identical finding order and score — the pipeline has no hidden
/// nondeterminism (hash-map iteration, thread scheduling, wall-clock reads
/// inside scoring logic).
#[test]
fn scan_is_deterministic_across_repeated_runs() {
    let dir = unprotected_mutation_project();
    let engine = Engine::new(dir.path(), Config::default());

    let first = engine.scan(ScanOptions::default()).unwrap().result;
    let second = engine.scan(ScanOptions::default()).unwrap().result;

    assert_eq!(first.score, second.score);
    assert_eq!(first.active_findings.len(), second.active_findings.len());
    for (a, b) in first.active_findings.iter().zip(second.active_findings.iter()) {
        assert_eq!(a.rule_id, b.rule_id);
        assert_eq!(a.file, b.file);
        assert_eq!(a.line, b.line);
        assert_eq!(a.severity, b.severity);
    }
}

/// 2. Findings are always sorted by (ruleId, file, line, column).
#[test]
fn findings_are_sorted_by_rule_then_file_then_line() {
    let dir = unprotected_mutation_project();
    write_file(
        dir.path(),
        "app/api/accounts/route.ts",
        r#"export async function POST(req) {
  const raw = await req.json();
  await db.account.create({ data: raw });
  return Response.json({ ok: true });
}
"#,
    );

    let engine = Engine::new(dir.path(), Config::default());
    let result = engine.scan(ScanOptions::default()).unwrap().result;

    let mut sorted = result.active_findings.clone();
    sorted.sort_by(|a, b| {
        a.rule_id
            .cmp(&b.rule_id)
            .then_with(|| a.file.cmp(&b.file))
            .then_with(|| a.line.unwrap_or(0).cmp(&b.line.unwrap_or(0)))
            .then_with(|| a.column.unwrap_or(0).cmp(&b.column.unwrap_or(0)))
    });
    assert_eq!(
        result.active_findings.iter().map(|f| (f.rule_id, f.file.clone(), f.line)).collect::<Vec<_>>(),
        sorted.iter().map(|f| (f.rule_id, f.file.clone(), f.line)).collect::<Vec<_>>(),
    );
}

/// 3. A per-rule severity cap in config never lets a finding exceed it,
/// even when the rule's own logic would otherwise escalate to critical.
#[test]
fn configured_severity_cap_is_never_exceeded() {
    let dir = unprotected_mutation_project();
    let mut config = Config::default();
    config.rules.insert("AUTH-BOUNDARY-MISSING".to_string(), RuleConfig { severity: Severity::Low });

    let engine = Engine::new(dir.path(), config);
    let result = engine.scan(ScanOptions::default()).unwrap().result;

    let auth_findings: Vec<_> = result.active_findings.iter().filter(|f| f.rule_id.as_str() == "AUTH-BOUNDARY-MISSING").collect();
    assert!(!auth_findings.is_empty());
    assert!(auth_findings.iter().all(|f| f.severity <= Severity::Low));
}

/// 4. Waiving a finding removes it from the active set and from scoring,
/// but it is never silently dropped from the scan output altogether.
#[test]
fn waived_findings_are_preserved_but_excluded_from_scoring() {
    let dir = unprotected_mutation_project();
    let waiver = Waiver {
        rule_id: "AUTH-BOUNDARY-MISSING".to_string(),
        file: "app/api/users/route.ts".to_string(),
        reason: "tracked separately".to_string(),
        expiry: None,
        created_at: Utc::now(),
    };

    let engine = Engine::new(dir.path(), Config::default());
    let waived = engine.scan(ScanOptions { waivers: vec![waiver], ..Default::default() }).unwrap().result;
    let unwaived = engine.scan(ScanOptions::default()).unwrap().result;

    assert!(waived.active_findings.iter().all(|f| !(f.rule_id.as_str() == "AUTH-BOUNDARY-MISSING" && f.file == "app/api/users/route.ts")));
    assert!(waived.waived_findings.iter().any(|f| f.rule_id.as_str() == "AUTH-BOUNDARY-MISSING"));
    assert!(waived.score > unwaived.score);
}

/// 5. An expired waiver has no effect — it neither waives the finding nor
/// crashes the scan.
#[test]
fn expired_waiver_does_not_waive_the_finding() {
    let dir = unprotected_mutation_project();
    let waiver = Waiver {
        rule_id: "AUTH-BOUNDARY-MISSING".to_string(),
        file: "app/api/users/route.ts".to_string(),
        reason: "long expired".to_string(),
        expiry: Some("2000-01-01".to_string()),
        created_at: Utc::now(),
    };

    let engine = Engine::new(dir.path(), Config::default());
    let result = engine.scan(ScanOptions { waivers: vec![waiver], ..Default::default() }).unwrap().result;

    assert!(result.active_findings.iter().any(|f| f.rule_id.as_str() == "AUTH-BOUNDARY-MISSING"));
    assert!(result.waived_findings.is_empty());
}

/// 6. The score is always clamped to the closed interval [0, 100], and
/// status tracks the documented thresholds regardless of how many
/// findings pile up.
#[test]
fn score_never_goes_negative_under_many_findings() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("package.json"),
        r#"{"dependencies":{"next":"14.0.0","@prisma/client":"5.0.0"}}"#,
    )
    .unwrap();
    write_file(dir.path(), "prisma/schema.prisma", "model Post {\n  id String @id\n  orgId String\n}\n");
    for i in 0..12 {
        write_file(
            dir.path(),
            &format!("app/api/route{i}/route.ts"),
            &format!(
                r#"export async function POST(req) {{
  const raw = await req.json();
  await db.post{i}.create({{ data: raw }});
  await db.post.findMany({{ where: {{ id: raw.id }} }});
  return Response.json({{ ok: true }});
}}
"#
            ),
        );
    }

    let engine = Engine::new(dir.path(), Config::default());
    let result = engine.scan(ScanOptions::default()).unwrap().result;

    assert!(result.score >= 0.0);
    assert!(result.score <= 100.0);
    assert_eq!(result.status, endpointguard_engine::model::ScanStatus::from_score(result.score));
}

/// 7. A route with no recognized auth signal at all gets high confidence
/// and critical severity; a route with auth-shaped but unproven code gets
/// a strictly lower confidence/severity pair. The rule never reports the
/// weaker signal as more confident than the absent one.
#[test]
fn unproven_auth_signal_is_never_more_confident_than_no_signal() {
    let no_signal_dir = tempfile::tempdir().unwrap();
    std::fs::write(no_signal_dir.path().join("package.json"), r#"{"dependencies":{"next":"14.0.0"}}"#).unwrap();
    write_file(
        no_signal_dir.path(),
        "app/api/a/route.ts",
        r#"export async function POST(req) {
  const raw = await req.json();
  await db.thing.create({ data: raw });
  return Response.json({ ok: true });
}
"#,
    );

    let heuristic_dir = tempfile::tempdir().unwrap();
    std::fs::write(heuristic_dir.path().join("package.json"), r#"{"dependencies":{"next":"14.0.0"}}"#).unwrap();
    write_file(
        heuristic_dir.path(),
        "app/api/b/route.ts",
        r#"export async function POST(req) {
  const token = headers().get("authorization");
  const raw = await req.json();
  await db.thing.create({ data: raw });
  return Response.json({ ok: true });
}
"#,
    );

    let no_signal = Engine::new(no_signal_dir.path(), Config::default()).scan(ScanOptions::default()).unwrap().result;
    let heuristic = Engine::new(heuristic_dir.path(), Config::default()).scan(ScanOptions::default()).unwrap().result;

    let no_signal_finding = no_signal.active_findings.iter().find(|f| f.rule_id.as_str() == "AUTH-BOUNDARY-MISSING").unwrap();
    let heuristic_finding = heuristic.active_findings.iter().find(|f| f.rule_id.as_str() == "AUTH-BOUNDARY-MISSING").unwrap();

    assert_eq!(no_signal_finding.severity, Severity::Critical);
    assert!(heuristic_finding.severity <= Severity::High);
}

/// 8. Strong (satisfied + enforced) auth unconditionally suppresses
/// RATE-LIMIT-MISSING on a route handler, with no override for any
/// pathname shape — the rule's early continue runs before any pathname
/// check.
#[test]
fn strong_auth_suppresses_rate_limit_missing_even_on_login_pathname() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("package.json"), r#"{"dependencies":{"next":"14.0.0"}}"#).unwrap();
    write_file(
        dir.path(),
        "app/api/auth/login/route.ts",
        r#"export async function POST(req) {
  await requireAuth();
  return Response.json({ ok: true });
}
"#,
    );

    let result = Engine::new(dir.path(), Config::default()).scan(ScanOptions::default()).unwrap().result;
    assert!(result.active_findings.iter().all(|f| f.rule_id.as_str() != "RATE-LIMIT-MISSING"));
}

/// 9. A resolved wrapper that proves enforcement is never also reported as
/// WRAPPER-UNRECOGNIZED — the two rules are mutually exclusive per wrapper.
#[test]
fn enforcing_wrapper_never_doubles_as_wrapper_unrecognized() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("package.json"), r#"{"dependencies":{"next":"14.0.0"}}"#).unwrap();
    write_file(
        dir.path(),
        "src/lib/auth.ts",
        r#"export const withWorkspace = (handler) => async (req) => {
  const session = await getSession();
  if (!session) {
    return new Response("Unauthorized", { status: 401 });
  }
  return handler(req);
};
"#,
    );
    write_file(
        dir.path(),
        "app/api/orgs/route.ts",
        r#"import { withWorkspace } from "@/lib/auth";

export const POST = withWorkspace(async (req) => {
  await rateLimit();
  const raw = await req.json();
  await db.org.create({ data: raw });
  return Response.json({ ok: true });
});
"#,
    );

    let result = Engine::new(dir.path(), Config::default()).scan(ScanOptions::default()).unwrap().result;
    assert!(result.active_findings.iter().all(|f| f.rule_id.as_str() != "WRAPPER-UNRECOGNIZED"));
}

/// 10. A dependency-scanner default (an auth function never listed in the
/// user's own config) is still recognized — the engine must thread the
/// scanner-derived hint set, not the raw user config, into every
/// direct-call check.
#[test]
fn ecosystem_default_auth_function_is_recognized_without_explicit_config() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("package.json"), r#"{"dependencies":{"next":"14.0.0"}}"#).unwrap();
    write_file(
        dir.path(),
        "app/api/c/route.ts",
        r#"export async function POST(req) {
  await getCurrentUser();
  const raw = await req.json();
  await db.thing.create({ data: raw });
  return Response.json({ ok: true });
}
"#,
    );

    let config = Config::default();
    assert!(config.hints.auth.functions.is_empty(), "this invariant only holds when the user supplied no hints");

    let result = Engine::new(dir.path(), config).scan(ScanOptions::default()).unwrap().result;
    assert!(result.active_findings.iter().all(|f| f.rule_id.as_str() != "AUTH-BOUNDARY-MISSING"));
}
