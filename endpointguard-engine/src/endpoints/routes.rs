//! Route-handler discovery (spec §4.4): every `route.{ext}` under the
//! application directory.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::endpoints::mutation::detect_mutation_signals;
use crate::endpoints::public_intent::{parse_public_intent, DirectiveResult};
use crate::model::RouteHandler;

const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE"];
const ROUTE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mts", "cts", "mjs", "cjs"];

static EXPORTED_METHOD: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    HTTP_METHODS
        .iter()
        .map(|m| {
            let pattern = format!(r"export\s+(?:async\s+)?function\s+{m}\s*\(|export\s+const\s+{m}\s*=");
            (Regex::new(&pattern).expect("static exported-method pattern"), *m)
        })
        .collect()
});

/// Discover route handlers under `app_dir`, given it relative to `root`.
pub fn discover(root: &Path, app_dir: &Path) -> Vec<RouteHandler> {
    let mut handlers = Vec::new();
    for ext in ROUTE_EXTENSIONS {
        let pattern = app_dir.join("**").join(format!("route.{ext}"));
        let Ok(paths) = glob::glob(&pattern.to_string_lossy()) else {
            continue;
        };
        for path in paths.flatten() {
            let Ok(text) = std::fs::read_to_string(&path) else {
                continue;
            };
            let rel = path.strip_prefix(root).unwrap_or(&path).to_string_lossy().replace('\\', "/");
            handlers.push(build_route_handler(&rel, app_dir, root, &text));
        }
    }
    handlers
}

fn build_route_handler(rel_path: &str, app_dir: &Path, root: &Path, text: &str) -> RouteHandler {
    let methods = detect_methods(text);
    let signals = detect_mutation_signals(text, true);
    let pathname = compute_pathname(rel_path, app_dir, root);
    let is_api = pathname.as_deref().is_some_and(|p| p.starts_with("/api"));

    let (public_intent, malformed_public_intent) = match parse_public_intent(text) {
        DirectiveResult::Valid(intent) => (Some(intent), None),
        DirectiveResult::Malformed(m) => (None, Some(m)),
        DirectiveResult::None => (None, None),
    };

    RouteHandler {
        file: rel_path.to_string(),
        methods,
        pathname,
        is_api,
        signals,
        public_intent,
        malformed_public_intent,
        protection: None,
    }
}

fn detect_methods(text: &str) -> Option<String> {
    let found: Vec<&str> = EXPORTED_METHOD
        .iter()
        .filter(|(re, _)| re.is_match(text))
        .map(|(_, m)| *m)
        .collect();
    if found.is_empty() {
        None
    } else {
        Some(found.join(","))
    }
}

/// Strip the app-dir prefix and the trailing `/route.*` to produce a
/// URL pathname.
fn compute_pathname(rel_path: &str, app_dir: &Path, root: &Path) -> Option<String> {
    let app_dir_rel = app_dir.strip_prefix(root).unwrap_or(app_dir).to_string_lossy().replace('\\', "/");
    let without_prefix = rel_path.strip_prefix(&*app_dir_rel)?;
    let without_route = without_prefix.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    let cleaned = strip_route_groups(without_route);
    Some(if cleaned.is_empty() { "/".to_string() } else { cleaned })
}

/// Next.js-style route groups `(group)` don't appear in the URL.
fn strip_route_groups(pathname: &str) -> String {
    pathname
        .split('/')
        .filter(|seg| !(seg.starts_with('(') && seg.ends_with(')')))
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_route_with_mutation_and_pathname() {
        let text = r#"
export async function POST(request) {
  const body = await request.json();
  await db.user.create({ data: body });
  return Response.json({ ok: true });
}
"#;
        let handler = build_route_handler("app/api/users/route.ts", Path::new("app"), Path::new(""), text);
        assert_eq!(handler.methods.as_deref(), Some("POST"));
        assert!(handler.signals.mutation_evidence);
        assert_eq!(handler.pathname.as_deref(), Some("/api/users"));
        assert!(handler.is_api);
    }

    #[test]
    fn strips_route_groups_from_pathname() {
        assert_eq!(strip_route_groups("(marketing)/about"), "about");
    }
}
