//! Project detector (spec §4.1).

use std::path::{Path, PathBuf};

use endpointguard_core::errors::ScanError;

const MANIFEST_CANDIDATES: &[&str] = &["package.json"];
const APP_DIR_CANDIDATES: &[&str] = &["app", "src/app"];
const ROUTE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mts", "cts", "mjs", "cjs"];
const SERVER_DIRECTIVE: &str = "\"use server\"";
const SERVER_DIRECTIVE_ALT: &str = "'use server'";

#[derive(Debug, Clone)]
pub struct ProjectDetection {
    pub ok: bool,
    pub reason: Option<ScanError>,
    pub app_dir: Option<PathBuf>,
    pub has_route_handlers: bool,
    pub has_server_actions: bool,
}

/// `ok=true` iff a manifest exists, the framework dependency is declared,
/// and an application directory convention resolves.
pub fn detect(root: &Path, framework_dependency: &str) -> ProjectDetection {
    let manifest = MANIFEST_CANDIDATES.iter().map(|m| root.join(m)).find(|p| p.is_file());
    let Some(manifest) = manifest else {
        return ProjectDetection {
            ok: false,
            reason: Some(ScanError::NoManifest),
            app_dir: None,
            has_route_handlers: false,
            has_server_actions: false,
        };
    };

    let manifest_text = std::fs::read_to_string(&manifest).unwrap_or_default();
    if !manifest_text.contains(framework_dependency) {
        return ProjectDetection {
            ok: false,
            reason: Some(ScanError::FrameworkNotDeclared),
            app_dir: None,
            has_route_handlers: false,
            has_server_actions: false,
        };
    }

    let app_dir = APP_DIR_CANDIDATES.iter().map(|d| root.join(d)).find(|p| p.is_dir());
    let Some(app_dir) = app_dir else {
        return ProjectDetection {
            ok: false,
            reason: Some(ScanError::NoAppDir),
            app_dir: None,
            has_route_handlers: false,
            has_server_actions: false,
        };
    };

    let has_route_handlers = glob_has_route_handler(&app_dir);
    let has_server_actions = scan_first_n_for_directive(&app_dir, 100);

    ProjectDetection {
        ok: true,
        reason: None,
        app_dir: Some(app_dir),
        has_route_handlers,
        has_server_actions,
    }
}

fn glob_has_route_handler(app_dir: &Path) -> bool {
    ROUTE_EXTENSIONS.iter().any(|ext| {
        let pattern = app_dir.join("**").join(format!("route.{ext}"));
        glob::glob(&pattern.to_string_lossy())
            .map(|mut paths| paths.next().is_some())
            .unwrap_or(false)
    })
}

fn scan_first_n_for_directive(app_dir: &Path, limit: usize) -> bool {
    let walker = ignore::WalkBuilder::new(app_dir).build();
    let mut checked = 0;
    for entry in walker.flatten() {
        if checked >= limit {
            break;
        }
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let Ok(text) = std::fs::read_to_string(entry.path()) else {
            continue;
        };
        checked += 1;
        if text.contains(SERVER_DIRECTIVE) || text.contains(SERVER_DIRECTIVE_ALT) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fails_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let detection = detect(dir.path(), "next");
        assert!(!detection.ok);
        assert!(matches!(detection.reason, Some(ScanError::NoManifest)));
    }

    #[test]
    fn fails_without_framework_dependency() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), r#"{"dependencies":{}}"#).unwrap();
        let detection = detect(dir.path(), "next");
        assert!(matches!(detection.reason, Some(ScanError::FrameworkNotDeclared)));
    }

    #[test]
    fn succeeds_with_manifest_framework_and_app_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), r#"{"dependencies":{"next":"14.0.0"}}"#).unwrap();
        std::fs::create_dir_all(dir.path().join("app/api/users")).unwrap();
        std::fs::write(dir.path().join("app/api/users/route.ts"), "export async function GET() {}").unwrap();
        let detection = detect(dir.path(), "next");
        assert!(detection.ok);
        assert!(detection.has_route_handlers);
    }
}
