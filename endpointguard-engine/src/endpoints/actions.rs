//! Server-action discovery (spec §4.4): files carrying a `"use server"`
//! directive, file-level or inline.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::endpoints::mutation::detect_mutation_signals;
use crate::model::ServerAction;

const SERVER_DIRECTIVE_PATTERNS: &[&str] = &["\"use server\"", "'use server'"];

static EXPORTED_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"export\s+(?:async\s+)?function\s+(\w+)|export\s+const\s+(\w+)\s*=")
        .expect("static exported-name pattern")
});

/// Walk `app_dir` and a secondary `src/` search for files carrying the
/// directive. Signals use the mutation catalog minus body-read heuristics
/// (server actions don't read a `Request` object the way route handlers do).
pub fn discover(root: &Path, app_dir: &Path) -> Vec<ServerAction> {
    let mut actions = Vec::new();
    for search_root in [app_dir.to_path_buf(), root.join("src")] {
        if !search_root.is_dir() {
            continue;
        }
        let walker = ignore::WalkBuilder::new(&search_root).build();
        for entry in walker.flatten() {
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.path();
            if !is_source_file(path) {
                continue;
            }
            let Ok(text) = std::fs::read_to_string(path) else {
                continue;
            };
            if !has_server_directive(&text) {
                continue;
            }
            let rel = path.strip_prefix(root).unwrap_or(path).to_string_lossy().replace('\\', "/");
            actions.extend(build_actions(&rel, &text));
        }
    }
    actions
}

fn is_source_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("ts") | Some("tsx") | Some("js") | Some("jsx")
    )
}

fn has_server_directive(text: &str) -> bool {
    SERVER_DIRECTIVE_PATTERNS.iter().any(|d| text.contains(d))
}

/// File-level directive (appears before any export) marks every exported
/// function/const; an inline directive inside a function body marks only
/// that function.
fn build_actions(file: &str, text: &str) -> Vec<ServerAction> {
    let file_level = is_file_level_directive(text);
    let mut actions = Vec::new();

    if file_level {
        for caps in EXPORTED_NAME.captures_iter(text) {
            let name = caps.get(1).or(caps.get(2)).map(|m| m.as_str().to_string());
            actions.push(ServerAction {
                file: file.to_string(),
                exported_name: name,
                signals: detect_mutation_signals(text, false),
            });
        }
    } else {
        for function_text in functions_with_inline_directive(text) {
            let name = EXPORTED_NAME
                .captures(&function_text)
                .and_then(|c| c.get(1).or(c.get(2)))
                .map(|m| m.as_str().to_string());
            actions.push(ServerAction {
                file: file.to_string(),
                exported_name: name,
                signals: detect_mutation_signals(&function_text, false),
            });
        }
    }

    if actions.is_empty() {
        actions.push(ServerAction {
            file: file.to_string(),
            exported_name: None,
            signals: detect_mutation_signals(text, false),
        });
    }

    actions
}

fn is_file_level_directive(text: &str) -> bool {
    let first_non_blank = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    SERVER_DIRECTIVE_PATTERNS.iter().any(|d| first_non_blank.trim() == *d)
}

/// A bounded-window approximation: each function-like block containing the
/// inline directive, delimited by brace counting.
fn functions_with_inline_directive(text: &str) -> Vec<String> {
    let mut results = Vec::new();
    let mut depth: i32 = 0;
    let mut current_start = None;
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '{' => {
                if depth == 0 {
                    current_start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                depth -= 1;
                if depth == 0 {
                    if let Some(start) = current_start.take() {
                        let block: String = chars[start..=i].iter().collect();
                        if has_server_directive(&block) {
                            results.push(block);
                        }
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    results
}
