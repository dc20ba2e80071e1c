//! Phase B — wrapper resolution (spec §4.6): find the wrapper's definition
//! file via its import, a local definition, or a barrel re-export chain.

use std::path::{Path, PathBuf};

use crate::parsers::TypeScriptParser;
use crate::resolver::ModuleResolver;

/// Resolve `wrapper_name` used in `route_file`: a local definition wins
/// outright; otherwise resolve its import specifier and follow barrel
/// re-exports (bounded at 5 hops inside the resolver).
pub fn resolve_definition_file(
    wrapper_name: &str,
    route_file: &Path,
    route_text: &str,
    resolver: &ModuleResolver,
    parser: &mut TypeScriptParser,
) -> Option<PathBuf> {
    let parsed = parser.parse(route_text);
    if parsed.functions.iter().any(|f| f.name == wrapper_name) {
        return Some(route_file.to_path_buf());
    }

    let specifier = find_import_specifier(route_text, wrapper_name)?;
    let resolved = resolver.resolve(&specifier, route_file).ok()?;
    Some(resolver.follow_re_export(wrapper_name, &resolved, parser))
}

/// Find the module specifier a name was imported from — named, aliased, or
/// default.
fn find_import_specifier(text: &str, name: &str) -> Option<String> {
    for line in text.lines() {
        let trimmed = line.trim();
        if !trimmed.starts_with("import") {
            continue;
        }
        let Some(from_idx) = trimmed.find("from") else {
            continue;
        };
        let clause = &trimmed[..from_idx];
        let matches_name = clause.contains(name);
        if !matches_name {
            continue;
        }
        let rest = &trimmed[from_idx + 4..];
        if let Some(spec) = extract_quoted(rest) {
            return Some(spec);
        }
    }
    None
}

fn extract_quoted(text: &str) -> Option<String> {
    let text = text.trim();
    let quote = text.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let rest = &text[1..];
    let end = rest.find(quote)?;
    Some(rest[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_named_import_specifier() {
        let text = "import { withWorkspace } from \"@/lib/auth\";\nexport const POST = withWorkspace(handler);\n";
        assert_eq!(find_import_specifier(text, "withWorkspace"), Some("@/lib/auth".to_string()));
    }

    #[test]
    fn returns_none_when_no_import_matches() {
        let text = "import { other } from \"./x\";";
        assert_eq!(find_import_specifier(text, "withWorkspace"), None);
    }
}
