//! Dependency scanner (spec §4.2): reads the manifest, merges in a
//! workspace root's deps for anything missing locally, and derives a
//! recognized-ecosystem bitmap plus default hints.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use endpointguard_core::config::{union_merge, AuthHints, HintsConfig, RateLimitHints, TenancyHints};

use crate::model::DependencyBitmap;

/// Ten recognized auth-provider families (spec §4.2).
const AUTH_PROVIDERS: &[(&str, &[&str])] = &[
    ("next-auth", &["getServerSession", "auth"]),
    ("@auth/core", &["auth"]),
    ("@clerk/nextjs", &["auth", "currentUser"]),
    ("@supabase/supabase-js", &["getUser", "getSession"]),
    ("@supabase/ssr", &["getUser", "getSession"]),
    ("lucia", &["validateSession"]),
    ("@workos-inc/node", &["getUser"]),
    ("firebase-admin", &["verifyIdToken"]),
    ("@auth0/nextjs-auth0", &["getSession"]),
    ("@kinde-oss/kinde-auth-nextjs", &["getUser"]),
];

/// Three rate-limit package families.
const RATE_LIMIT_PACKAGES: &[(&str, &[&str])] = &[
    ("@upstash/ratelimit", &["ratelimit", "limit"]),
    ("rate-limiter-flexible", &["consume"]),
    ("@unkey/ratelimit", &["limit"]),
];

/// Two recognized ORMs.
const ORMS: &[&str] = &["@prisma/client", "drizzle-orm"];

const TYPED_RPC_MARKER: &str = "@trpc/server";

const DEFAULT_AUTH_FUNCTIONS: &[&str] = &["getSession", "getCurrentUser", "requireAuth", "requireUser"];
const DEFAULT_RATE_LIMIT_WRAPPERS: &[&str] = &["rateLimit", "withRateLimit", "limiter"];
const DEFAULT_ORG_FIELD_NAMES: &[&str] = &["orgId", "tenantId", "workspaceId", "organizationId"];

#[derive(Debug, Clone, Default)]
struct Manifest {
    deps: BTreeMap<String, String>,
}

fn read_manifest(path: &Path) -> Manifest {
    let Ok(text) = std::fs::read_to_string(path) else {
        return Manifest::default();
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) else {
        return Manifest::default();
    };
    let mut deps = BTreeMap::new();
    for key in ["dependencies", "devDependencies"] {
        if let Some(obj) = value.get(key).and_then(|v| v.as_object()) {
            for (name, version) in obj {
                deps.entry(name.clone())
                    .or_insert_with(|| version.as_str().unwrap_or("*").to_string());
            }
        }
    }
    Manifest { deps }
}

/// Marker files that indicate a workspace root, walking upward from `root`.
fn find_workspace_root(root: &Path) -> Option<PathBuf> {
    let mut current = root.parent()?;
    loop {
        let manifest = current.join("package.json");
        if manifest.is_file() {
            let text = std::fs::read_to_string(&manifest).unwrap_or_default();
            if text.contains("\"workspaces\"") {
                return Some(current.to_path_buf());
            }
        }
        if current.join("pnpm-workspace.yaml").is_file() || current.join("turbo.json").is_file() {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

pub struct DependencyScanResult {
    pub bitmap: DependencyBitmap,
    pub hints: HintsConfig,
    pub workspace_root: Option<PathBuf>,
}

/// Scan the project manifest, merging a workspace root's deps for keys
/// missing locally, and derive the ecosystem bitmap and default hints.
pub fn scan(root: &Path, user_hints: &HintsConfig) -> DependencyScanResult {
    let mut manifest = read_manifest(&root.join("package.json"));
    let workspace_root = find_workspace_root(root);

    if let Some(ws_root) = &workspace_root {
        let ws_manifest = read_manifest(&ws_root.join("package.json"));
        for (name, version) in ws_manifest.deps {
            manifest.deps.entry(name).or_insert(version);
        }
    }

    let mut bitmap = DependencyBitmap::default();
    let mut auth_functions: Vec<String> = DEFAULT_AUTH_FUNCTIONS.iter().map(|s| s.to_string()).collect();
    let mut rate_limit_wrappers: Vec<String> =
        DEFAULT_RATE_LIMIT_WRAPPERS.iter().map(|s| s.to_string()).collect();

    for (package, functions) in AUTH_PROVIDERS {
        if manifest.deps.contains_key(*package) {
            bitmap.auth_providers.push(package.to_string());
            auth_functions.extend(functions.iter().map(|s| s.to_string()));
        }
    }
    for (package, wrappers) in RATE_LIMIT_PACKAGES {
        if manifest.deps.contains_key(*package) {
            bitmap.rate_limit_packages.push(package.to_string());
            rate_limit_wrappers.extend(wrappers.iter().map(|s| s.to_string()));
        }
    }
    for package in ORMS {
        if manifest.deps.contains_key(*package) {
            bitmap.orms.push(package.to_string());
        }
    }
    bitmap.has_typed_rpc = manifest.deps.contains_key(TYPED_RPC_MARKER);

    let derived = HintsConfig {
        auth: AuthHints {
            functions: union_merge(&auth_functions, &user_hints.auth.functions),
            middleware_files: user_hints.auth.middleware_files.clone(),
            allowlist_paths: user_hints.auth.allowlist_paths.clone(),
        },
        rate_limit: RateLimitHints {
            wrappers: union_merge(&rate_limit_wrappers, &user_hints.rate_limit.wrappers),
            allowlist_paths: user_hints.rate_limit.allowlist_paths.clone(),
        },
        tenancy: TenancyHints {
            org_field_names: union_merge(
                &DEFAULT_ORG_FIELD_NAMES.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
                &user_hints.tenancy.org_field_names,
            ),
        },
    };

    DependencyScanResult {
        bitmap,
        hints: derived,
        workspace_root,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_recognized_auth_provider() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            r#"{"dependencies":{"next-auth":"5.0.0"}}"#,
        )
        .unwrap();
        let result = scan(dir.path(), &HintsConfig::default());
        assert_eq!(result.bitmap.auth_providers, vec!["next-auth".to_string()]);
        assert!(result.hints.auth.functions.contains(&"getServerSession".to_string()));
    }

    #[test]
    fn merges_workspace_root_deps_when_missing_locally() {
        let workspace = tempfile::tempdir().unwrap();
        std::fs::write(
            workspace.path().join("package.json"),
            r#"{"workspaces":["apps/*"],"dependencies":{"@prisma/client":"5.0.0"}}"#,
        )
        .unwrap();
        let app_dir = workspace.path().join("apps/web");
        std::fs::create_dir_all(&app_dir).unwrap();
        std::fs::write(app_dir.join("package.json"), r#"{"dependencies":{"next":"14.0.0"}}"#).unwrap();

        let result = scan(&app_dir, &HintsConfig::default());
        assert_eq!(result.bitmap.orms, vec!["@prisma/client".to_string()]);
    }

    #[test]
    fn local_dependency_wins_over_workspace_root() {
        let workspace = tempfile::tempdir().unwrap();
        std::fs::write(
            workspace.path().join("package.json"),
            r#"{"workspaces":["apps/*"],"dependencies":{"@prisma/client":"1.0.0"}}"#,
        )
        .unwrap();
        let app_dir = workspace.path().join("apps/web");
        std::fs::create_dir_all(&app_dir).unwrap();
        std::fs::write(
            app_dir.join("package.json"),
            r#"{"dependencies":{"@prisma/client":"5.0.0"}}"#,
        )
        .unwrap();

        let manifest = read_manifest(&app_dir.join("package.json"));
        assert_eq!(manifest.deps.get("@prisma/client"), Some(&"5.0.0".to_string()));
    }
}
