//! Middleware analyzer (spec §4.3): reads the project's middleware file,
//! if any, and extracts conservative auth/rate-limit heuristics plus route
//! matcher patterns. No execution, no parsing — lexical only, by design.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

/// Ordered candidate paths: root and `src/` nesting, primary and alternate
/// extensions (spec §4.3).
fn candidate_paths(root: &Path) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    for dir in [".", "src"] {
        for ext in ["ts", "js", "mjs", "cjs"] {
            candidates.push(root.join(dir).join(format!("middleware.{ext}")));
        }
    }
    candidates
}

static AUTH_LIKELY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\bgetSession\s*\(",
        r"\bgetServerSession\s*\(",
        r"\bauth\s*\(",
        r"\bgetToken\s*\(",
        r"\bverifyJwt\s*\(",
        r"\bsession\.user\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static middleware auth pattern"))
    .collect()
});

static RATE_LIMIT_SUBSTRING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(ratelimit|rate[_-]?limit|upstash)").expect("static rate-limit pattern")
});

static MATCHER_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"matcher\s*:\s*\[([^\]]*)\]").expect("static matcher pattern"));

static QUOTED_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["']([^"']+)["']"#).expect("static quoted literal pattern"));

#[derive(Debug, Clone, Default)]
pub struct MiddlewareAnalysis {
    pub file: Option<PathBuf>,
    pub auth_likely: bool,
    pub rate_limit_likely: bool,
    pub matchers: Vec<String>,
}

impl MiddlewareAnalysis {
    /// Matcher coverage (spec §4.7): a `suffix /:path*` or `(.*)` suffix
    /// collapses to a prefix match; otherwise exact or prefix-with-`/`. No
    /// matchers at all means "all".
    pub fn covers(&self, pathname: &str) -> bool {
        if self.matchers.is_empty() {
            return true;
        }
        self.matchers.iter().any(|m| matcher_covers(m, pathname))
    }
}

fn matcher_covers(matcher: &str, pathname: &str) -> bool {
    if let Some(prefix) = matcher.strip_suffix("/:path*") {
        return pathname == prefix || pathname.starts_with(&format!("{prefix}/"));
    }
    if let Some(prefix) = matcher.strip_suffix("(.*)") {
        return pathname.starts_with(prefix);
    }
    pathname == matcher || pathname.starts_with(&format!("{matcher}/"))
}

/// Read the nearest existing middleware file, trying `workspace_root` as a
/// fallback when no local file exists (spec §4.3, §9: the redesign flag
/// mandating the workspace-root fallback when local middleware is absent).
pub fn analyze(root: &Path, workspace_root: Option<&Path>) -> MiddlewareAnalysis {
    for candidate in candidate_paths(root) {
        if candidate.is_file() {
            return analyze_file(&candidate);
        }
    }
    if let Some(workspace_root) = workspace_root {
        for candidate in candidate_paths(workspace_root) {
            if candidate.is_file() {
                return analyze_file(&candidate);
            }
        }
    }
    MiddlewareAnalysis::default()
}

fn analyze_file(path: &Path) -> MiddlewareAnalysis {
    let text = std::fs::read_to_string(path).unwrap_or_default();
    let auth_likely = AUTH_LIKELY_PATTERNS.iter().any(|re| re.is_match(&text));
    let rate_limit_likely = RATE_LIMIT_SUBSTRING.is_match(&text);
    let matchers = MATCHER_BLOCK
        .captures(&text)
        .map(|caps| {
            QUOTED_LITERAL
                .captures_iter(&caps[1])
                .map(|c| c[1].to_string())
                .collect()
        })
        .unwrap_or_default();

    MiddlewareAnalysis {
        file: Some(path.to_path_buf()),
        auth_likely,
        rate_limit_likely,
        matchers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_auth_likely_and_matchers() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("middleware.ts"),
            r#"
            import { getSession } from "./auth";
            export const config = { matcher: ["/api/:path*", "/dashboard"] };
            "#,
        )
        .unwrap();
        let analysis = analyze(dir.path(), None);
        assert!(analysis.auth_likely);
        assert_eq!(analysis.matchers, vec!["/api/:path*".to_string(), "/dashboard".to_string()]);
        assert!(analysis.covers("/api/users"));
        assert!(analysis.covers("/dashboard"));
        assert!(!analysis.covers("/other"));
    }

    #[test]
    fn falls_back_to_workspace_root_when_local_absent() {
        let workspace = tempfile::tempdir().unwrap();
        let local = tempfile::tempdir().unwrap();
        std::fs::write(workspace.path().join("middleware.ts"), "upstash ratelimit here").unwrap();
        let analysis = analyze(local.path(), Some(workspace.path()));
        assert!(analysis.rate_limit_likely);
    }

    #[test]
    fn no_matchers_means_covers_everything() {
        let analysis = MiddlewareAnalysis::default();
        assert!(analysis.covers("/anything"));
    }
}
