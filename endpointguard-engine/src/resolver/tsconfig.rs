//! tsconfig.json loading: JSONC parsing and `extends` chain resolution
//! (spec §4.5).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use endpointguard_core::errors::ResolveError;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
struct RawTsconfig {
    #[serde(default)]
    extends: Option<String>,
    #[serde(default, rename = "compilerOptions")]
    compiler_options: Option<RawCompilerOptions>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawCompilerOptions {
    #[serde(default, rename = "baseUrl")]
    base_url: Option<String>,
    #[serde(default)]
    paths: Option<std::collections::BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Clone, Default)]
pub struct TsConfig {
    pub base_url: Option<String>,
    pub paths: Vec<(String, Vec<String>)>,
}

/// Strip `//` and `/* */` comments and trailing commas so JSONC parses as
/// plain JSON. Comment markers inside string literals are respected.
pub fn strip_jsonc(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut i = 0;
    let mut in_string = false;
    let mut string_quote = b'"';
    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            out.push(b as char);
            if b == b'\\' && i + 1 < bytes.len() {
                out.push(bytes[i + 1] as char);
                i += 2;
                continue;
            }
            if b == string_quote {
                in_string = false;
            }
            i += 1;
            continue;
        }
        match b {
            b'"' | b'\'' => {
                in_string = true;
                string_quote = b;
                out.push(b as char);
                i += 1;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 2;
            }
            _ => {
                out.push(b as char);
                i += 1;
            }
        }
    }
    strip_trailing_commas(&out)
}

fn strip_trailing_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == ',' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len() && (chars[j] == '}' || chars[j] == ']') {
                i += 1;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Load a tsconfig and follow its `extends` chain, cycle-safe. Child
/// `baseUrl`/`paths` override the parent's (spec §4.5).
pub fn load_tsconfig_chain(start: &Path) -> Result<TsConfig, ResolveError> {
    let mut visited = HashSet::new();
    load_chain_inner(start, &mut visited)
}

fn load_chain_inner(path: &Path, visited: &mut HashSet<PathBuf>) -> Result<TsConfig, ResolveError> {
    let canonical = path.to_path_buf();
    if !visited.insert(canonical.clone()) {
        return Err(ResolveError::ExtendsCycle(path.display().to_string()));
    }

    let text = std::fs::read_to_string(path).map_err(|e| ResolveError::MalformedTsconfig {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let stripped = strip_jsonc(&text);
    let raw: RawTsconfig = serde_json::from_str(&stripped).map_err(|e| ResolveError::MalformedTsconfig {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let mut config = TsConfig::default();
    if let Some(parent_spec) = &raw.extends {
        let parent_path = resolve_extends_path(path, parent_spec);
        if let Ok(parent) = load_chain_inner(&parent_path, visited) {
            config = parent;
        }
    }

    if let Some(opts) = raw.compiler_options {
        if let Some(base_url) = opts.base_url {
            config.base_url = Some(base_url);
        }
        if let Some(paths) = opts.paths {
            config.paths = paths.into_iter().collect();
        }
    }

    Ok(config)
}

fn resolve_extends_path(from: &Path, spec: &str) -> PathBuf {
    let dir = from.parent().unwrap_or_else(|| Path::new("."));
    let mut candidate = if spec.starts_with('.') {
        dir.join(spec)
    } else {
        dir.join("node_modules").join(spec)
    };
    if candidate.extension().is_none() {
        candidate.set_extension("json");
    }
    candidate
}
