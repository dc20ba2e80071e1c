//! Module resolver: maps an import specifier in a source file to a
//! repo-relative file path, and follows barrel re-exports to a symbol's
//! defining file (spec §4.5).

mod probe;
mod tsconfig;

pub use tsconfig::{load_tsconfig_chain, strip_jsonc, TsConfig};

use std::path::{Path, PathBuf};

use endpointguard_core::errors::ResolveError;

use crate::parsers::{ParseResult, TypeScriptParser};

pub struct ModuleResolver {
    root: PathBuf,
    tsconfig: TsConfig,
}

impl ModuleResolver {
    pub fn new(root: impl Into<PathBuf>, tsconfig: TsConfig) -> Self {
        Self {
            root: root.into(),
            tsconfig,
        }
    }

    /// Resolution order for specifier `s` from file `f` (spec §4.5).
    pub fn resolve(&self, specifier: &str, from_file: &Path) -> Result<PathBuf, ResolveError> {
        if let Some(rel) = specifier.strip_prefix('.').map(|_| specifier) {
            let from_dir = from_file.parent().unwrap_or(&self.root);
            let joined = from_dir.join(rel);
            let relative = pathdiff(&self.root, &joined);
            if let Some(found) = probe::probe(&self.root, &relative) {
                return Ok(found);
            }
        }

        if !self.tsconfig.paths.is_empty() {
            let base = self.tsconfig.base_url.as_deref().unwrap_or(".");
            for (pattern, targets) in &self.tsconfig.paths {
                if let Some(matched) = match_paths_pattern(pattern, specifier) {
                    for target in targets {
                        let substituted = target.replacen('*', &matched, 1);
                        let candidate = Path::new(base).join(&substituted);
                        if let Some(found) = probe::probe(&self.root, &candidate) {
                            return Ok(found);
                        }
                    }
                }
            }
        }

        if let Some(rest) = specifier.strip_prefix("@/").or_else(|| specifier.strip_prefix("~/")) {
            let candidate = Path::new("src").join(rest);
            if let Some(found) = probe::probe(&self.root, &candidate) {
                return Ok(found);
            }
        }

        if let Some(base_url) = &self.tsconfig.base_url {
            let candidate = Path::new(base_url).join(specifier);
            if let Some(found) = probe::probe(&self.root, &candidate) {
                return Ok(found);
            }
        }

        Err(ResolveError::BareSpecifier(specifier.to_string()))
    }

    /// `followReExport(symbol, startFile, maxHops=5)` (spec §4.5). Fails
    /// safely by returning the starting file when nothing more specific can
    /// be found, so callers can still analyze whatever text is there.
    pub fn follow_re_export(
        &self,
        symbol: &str,
        start_file: &Path,
        parser: &mut TypeScriptParser,
    ) -> PathBuf {
        let mut visited = std::collections::HashSet::new();
        self.follow_inner(symbol, start_file, parser, &mut visited, 0)
    }

    fn follow_inner(
        &self,
        symbol: &str,
        file: &Path,
        parser: &mut TypeScriptParser,
        visited: &mut std::collections::HashSet<PathBuf>,
        hops: u32,
    ) -> PathBuf {
        if hops >= 5 || !visited.insert(file.to_path_buf()) {
            return file.to_path_buf();
        }

        let source = match std::fs::read_to_string(file) {
            Ok(s) => s,
            Err(_) => return file.to_path_buf(),
        };
        let parsed = parser.parse(&source);

        if has_local_definition(&parsed, symbol) {
            return file.to_path_buf();
        }

        if let Some(named_export) = parsed
            .exports
            .iter()
            .find(|e| e.name == symbol && e.from_source.is_some())
        {
            let source_spec = named_export.from_source.clone().unwrap();
            if let Ok(next) = self.resolve(&source_spec, file) {
                return self.follow_inner(symbol, &next, parser, visited, hops + 1);
            }
        }

        for wildcard_source in wildcard_reexport_sources(&source) {
            if let Ok(next) = self.resolve(&wildcard_source, file) {
                let next_source = std::fs::read_to_string(&next).unwrap_or_default();
                let next_parsed = parser.parse(&next_source);
                if has_local_definition(&next_parsed, symbol) {
                    return next;
                }
            }
        }

        file.to_path_buf()
    }
}

fn has_local_definition(result: &ParseResult, symbol: &str) -> bool {
    result.functions.iter().any(|f| f.name == symbol)
}

/// `export * from "<path>"` sources, found textually since the tree-sitter
/// query set doesn't special-case the wildcard form.
fn wildcard_reexport_sources(source: &str) -> Vec<String> {
    let mut out = Vec::new();
    for line in source.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("export * from") {
            if let Some(spec) = extract_quoted(rest) {
                out.push(spec);
            }
        }
    }
    out
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

/// A pattern with at most one `*` (spec §4.5 step 2); returns the substring
/// matched by `*` when `specifier` matches `pattern`.
fn match_paths_pattern(pattern: &str, specifier: &str) -> Option<String> {
    match pattern.find('*') {
        None => (pattern == specifier).then(|| String::new()),
        Some(star_idx) => {
            let prefix = &pattern[..star_idx];
            let suffix = &pattern[star_idx + 1..];
            if specifier.starts_with(prefix) && specifier.ends_with(suffix) && specifier.len() >= prefix.len() + suffix.len() {
                Some(specifier[prefix.len()..specifier.len() - suffix.len()].to_string())
            } else {
                None
            }
        }
    }
}

fn pathdiff(root: &Path, absolute: &Path) -> PathBuf {
    absolute
        .strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| absolute.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_single_wildcard_pattern() {
        assert_eq!(match_paths_pattern("@/*", "@/lib/auth"), Some("lib/auth".to_string()));
        assert_eq!(match_paths_pattern("@/components", "@/components"), Some(String::new()));
        assert_eq!(match_paths_pattern("@/*", "other"), None);
    }

    #[test]
    fn resolves_relative_specifier_with_extension_probing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("auth.ts"), "export const x = 1;").unwrap();
        let resolver = ModuleResolver::new(dir.path(), TsConfig::default());
        let from = dir.path().join("route.ts");
        let resolved = resolver.resolve("./auth", &from).unwrap();
        assert!(resolved.ends_with("auth.ts"));
    }
}
