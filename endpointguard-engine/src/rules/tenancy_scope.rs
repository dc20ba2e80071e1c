//! TENANCY-SCOPE-MISSING (spec §4.8): ORM queries with no visible
//! tenant-scoping field nearby.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use endpointguard_core::{Confidence, Severity};

use crate::model::{DependencyBitmap, Finding, RuleId};

const WRITE_METHODS: &[&str] = &["update", "updateMany", "delete", "deleteMany", "upsert"];
const READ_METHODS: &[&str] = &["findUnique", "findFirst", "findMany"];

static ORM_BOOTSTRAP_CANDIDATES: &[&str] = &[
    "lib/db.ts",
    "lib/prisma.ts",
    "src/lib/db.ts",
    "src/lib/prisma.ts",
    "lib/db.js",
    "src/db.ts",
];

static METHOD_LINE: LazyLock<Regex> = LazyLock::new(|| {
    let methods = WRITE_METHODS.iter().chain(READ_METHODS).cloned().collect::<Vec<_>>().join("|");
    Regex::new(&format!(r"\.({methods})\s*\(")).expect("static tenancy method-line pattern")
});

static TENANT_FIELD_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(orgId|tenantId|workspaceId|organizationId)").expect("static tenant-field pattern"));

fn bootstrap_has_org_scoping(root: &Path, org_field_names: &[String]) -> bool {
    for candidate in ORM_BOOTSTRAP_CANDIDATES {
        let path = root.join(candidate);
        let Ok(text) = std::fs::read_to_string(&path) else {
            continue;
        };
        let has_use_or_extends = text.contains("$use(") || text.contains("$extends(");
        if has_use_or_extends && org_field_names.iter().any(|f| text.contains(f)) {
            return true;
        }
    }
    false
}

/// Check the 15 lines following a matched ORM call for any configured
/// tenant-scoping field name (spec §4.8).
fn window_has_org_field(lines: &[&str], start: usize, org_field_names: &[String]) -> bool {
    let end = (start + 15).min(lines.len());
    lines[start..end].iter().any(|line| org_field_names.iter().any(|f| line.contains(f.as_str())))
}

fn schema_has_tenant_field(root: &Path, include_paths: &[String]) -> bool {
    let candidates: Vec<std::path::PathBuf> = if include_paths.is_empty() {
        vec![root.join("prisma/schema.prisma"), root.join("schema.prisma"), root.join("drizzle/schema.ts")]
    } else {
        include_paths.iter().map(|p| root.join(p)).collect()
    };
    candidates.iter().any(|p| {
        std::fs::read_to_string(p)
            .map(|t| TENANT_FIELD_NAME.is_match(&t))
            .unwrap_or(false)
    })
}

/// Evaluate TENANCY-SCOPE-MISSING over the project's include paths.
pub fn run(
    root: &Path,
    bitmap: &DependencyBitmap,
    include_paths: &[String],
    org_field_names: &[String],
    severity_cap: Option<Severity>,
) -> Vec<Finding> {
    let mut findings = Vec::new();

    if !bitmap.has_any_orm() {
        return findings;
    }
    if !schema_has_tenant_field(root, &[]) {
        return findings;
    }
    if bootstrap_has_org_scoping(root, org_field_names) {
        return findings;
    }

    let walker = ignore::WalkBuilder::new(root).build();
    for entry in walker.flatten() {
        let Some(file_type) = entry.file_type() else { continue };
        if !file_type.is_file() {
            continue;
        }
        let path = entry.path();
        if !include_paths.is_empty() {
            let rel = path.strip_prefix(root).unwrap_or(path).to_string_lossy().replace('\\', "/");
            if !include_paths.iter().any(|p| rel.starts_with(p.as_str())) {
                continue;
            }
        }
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !matches!(ext, "ts" | "tsx" | "js" | "jsx") {
            continue;
        }
        let Ok(text) = std::fs::read_to_string(path) else { continue };
        let rel = path.strip_prefix(root).unwrap_or(path).to_string_lossy().replace('\\', "/");
        let lines: Vec<&str> = text.lines().collect();

        for (idx, line) in lines.iter().enumerate() {
            let Some(caps) = METHOD_LINE.captures(line) else {
                continue;
            };
            if window_has_org_field(&lines, idx, org_field_names) {
                continue;
            }
            let method = caps[1].to_string();
            let is_write = WRITE_METHODS.contains(&method.as_str());
            let mut severity = if is_write { Severity::High } else { Severity::Med };
            if let Some(cap) = severity_cap {
                severity = severity.clamp_to(cap);
            }

            findings.push(Finding {
                rule_id: RuleId::TenancyScopeMissing,
                severity,
                confidence: if is_write { Confidence::High } else { Confidence::Med },
                message: format!("{rel}:{} calls .{method}( with no visible tenant scoping field nearby", idx + 1),
                file: rel.clone(),
                line: Some(idx as u32 + 1),
                column: None,
                end_line: None,
                end_column: None,
                snippet: Some(line.trim().to_string()),
                evidence: vec![format!("no {:?} found within 15 lines", org_field_names)],
                confidence_rationale: if is_write {
                    "write method with no tenant-scoping field in range".to_string()
                } else {
                    "read method with no tenant-scoping field in range".to_string()
                },
                remediation: vec![format!("Add a `{}`-style filter to this query.", org_field_names.first().cloned().unwrap_or_default())],
                tags: vec!["tenancy".to_string()],
            });
        }
    }

    findings
}
