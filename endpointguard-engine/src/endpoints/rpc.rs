//! Typed-RPC index builder (spec §4.4): finds the proxy route under
//! `api/rpc/**`, resolves the root router, and walks router-object entries
//! to extract procedures.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::endpoints::mutation::detect_mutation_signals;
use crate::model::{RpcProcedure, RpcProcedureKind, RpcProcedureType};
use crate::resolver::ModuleResolver;

const HANDLER_MARKERS: &[&str] = &["fetchRequestHandler", "createHTTPHandler", "trpcServer"];

static ROUTER_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"import\s+(?:\{\s*(\w+)(?:\s+as\s+(\w+))?\s*\}|(\w+))\s+from\s+["']([^"']+)["']"#)
        .expect("static router-import pattern")
});

static PROCEDURE_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<type>public|protected|authed|admin|private|authenticated)?Procedure")
        .expect("static procedure-value pattern")
});

static PROCEDURE_KIND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.(mutation|query|subscription)\s*\(").expect("static procedure-kind pattern"));

/// Find a proxy route under `api/rpc/**` whose body mentions a recognized
/// handler marker.
pub fn find_proxy_route(root: &Path) -> Option<std::path::PathBuf> {
    let pattern = root.join("app").join("api").join("rpc").join("**").join("route.*");
    glob::glob(&pattern.to_string_lossy()).ok()?.flatten().find(|path| {
        std::fs::read_to_string(path)
            .map(|text| HANDLER_MARKERS.iter().any(|m| text.contains(m)))
            .unwrap_or(false)
    })
}

fn find_root_router_import(proxy_text: &str) -> Option<(String, String)> {
    for caps in ROUTER_IMPORT.captures_iter(proxy_text) {
        let source = caps.get(4)?.as_str().to_string();
        if let Some(named) = caps.get(1) {
            let local = caps.get(2).map(|m| m.as_str()).unwrap_or(named.as_str());
            if local.to_lowercase().contains("router") {
                return Some((named.as_str().to_string(), source));
            }
        } else if let Some(default) = caps.get(3) {
            if default.as_str().to_lowercase().contains("router") {
                return Some((default.as_str().to_string(), source));
            }
        }
    }
    None
}

#[derive(Debug)]
enum RouterEntry {
    Procedure { name: String, body: String, line: u32 },
    SubRouterRef { name: String, import_name: String },
}

/// Walk the top-level entries of a router object literal, tracking brace
/// depth, classifying each as a procedure or a sub-router reference.
fn walk_router_entries(text: &str) -> Vec<RouterEntry> {
    let mut entries = Vec::new();
    let Some(router_start) = text.find("router(") else {
        return entries;
    };
    let Some(brace_start) = text[router_start..].find('{') else {
        return entries;
    };
    let body_start = router_start + brace_start + 1;

    let bytes = text.as_bytes();
    let mut depth = 1i32;
    let mut i = body_start;
    let mut entry_start = body_start;

    while i < bytes.len() && depth > 0 {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            b',' if depth == 1 => {
                push_entry(text, entry_start, i, &mut entries);
                entry_start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if entry_start < i {
        push_entry(text, entry_start, i, &mut entries);
    }
    entries
}

fn push_entry(text: &str, start: usize, end: usize, entries: &mut Vec<RouterEntry>) {
    let slice = text[start..end].trim();
    if slice.is_empty() {
        return;
    }
    let Some((name, value)) = slice.split_once(':') else {
        return;
    };
    let name = name.trim().to_string();
    let value = value.trim();

    if PROCEDURE_VALUE.is_match(value) && !value.contains("Router") {
        let line = text[..start].lines().count() as u32 + 1;
        entries.push(RouterEntry::Procedure {
            name,
            body: gather_procedure_body(text, start),
            line,
        });
    } else if let Some(import_name) = value.split('.').next() {
        entries.push(RouterEntry::SubRouterRef {
            name,
            import_name: import_name.to_string(),
        });
    }
}

/// Gather subsequent lines until the chain closes (`),` at entry indent or
/// `});`).
fn gather_procedure_body(text: &str, start: usize) -> String {
    let after = &text[start..];
    let end = after
        .find("),\n")
        .or_else(|| after.find("});"))
        .unwrap_or(after.len().min(2000));
    after[..end.min(after.len())].to_string()
}

fn classify_kind(body: &str) -> RpcProcedureKind {
    match PROCEDURE_KIND.captures(body).and_then(|c| c.get(1)).map(|m| m.as_str()) {
        Some("mutation") => RpcProcedureKind::Mutation,
        Some("query") => RpcProcedureKind::Query,
        Some("subscription") => RpcProcedureKind::Subscription,
        _ => RpcProcedureKind::Unknown,
    }
}

fn classify_type(value_prefix: &str) -> RpcProcedureType {
    match value_prefix {
        "public" => RpcProcedureType::Public,
        "protected" | "authed" | "admin" | "private" | "authenticated" => RpcProcedureType::Protected,
        _ => RpcProcedureType::Unknown,
    }
}

/// Build the typed-RPC procedure index, one hop of sub-router resolution
/// deep (no recursion beyond that, per spec §4.4).
pub fn discover(root: &Path, resolver: &ModuleResolver) -> Vec<RpcProcedure> {
    let mut procedures = Vec::new();
    let Some(proxy_path) = find_proxy_route(root) else {
        return procedures;
    };
    let Ok(proxy_text) = std::fs::read_to_string(&proxy_path) else {
        return procedures;
    };
    let Some((_import_name, source)) = find_root_router_import(&proxy_text) else {
        return procedures;
    };
    let Ok(router_file) = resolver.resolve(&source, &proxy_path) else {
        return procedures;
    };

    collect_from_router_file(&router_file, root, resolver, "", &mut procedures, 0);
    procedures
}

fn collect_from_router_file(
    router_file: &Path,
    root: &Path,
    resolver: &ModuleResolver,
    name_prefix: &str,
    procedures: &mut Vec<RpcProcedure>,
    depth: u32,
) {
    let Ok(text) = std::fs::read_to_string(router_file) else {
        return;
    };
    let rel = router_file.strip_prefix(root).unwrap_or(router_file).to_string_lossy().replace('\\', "/");

    for entry in walk_router_entries(&text) {
        match entry {
            RouterEntry::Procedure { name, body, line } => {
                let dotted_name = if name_prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{name_prefix}.{name}")
                };
                let type_prefix = PROCEDURE_VALUE
                    .captures(&body)
                    .and_then(|c| c.name("type"))
                    .map(|m| m.as_str())
                    .unwrap_or("");
                procedures.push(RpcProcedure {
                    name: dotted_name,
                    file: rel.clone(),
                    line,
                    procedure_type: classify_type(type_prefix),
                    procedure_kind: classify_kind(&body),
                    signals: detect_mutation_signals(&body, false),
                });
            }
            RouterEntry::SubRouterRef { name, import_name } if depth == 0 => {
                if let Ok(sub_source) = find_import_source(&text, &import_name) {
                    if let Ok(sub_file) = resolver.resolve(&sub_source, router_file) {
                        let nested_prefix = if name_prefix.is_empty() {
                            name.clone()
                        } else {
                            format!("{name_prefix}.{name}")
                        };
                        collect_from_router_file(&sub_file, root, resolver, &nested_prefix, procedures, depth + 1);
                    }
                }
            }
            RouterEntry::SubRouterRef { .. } => {}
        }
    }
}

fn find_import_source(text: &str, import_name: &str) -> Result<String, ()> {
    for caps in ROUTER_IMPORT.captures_iter(text) {
        let local = caps
            .get(2)
            .or(caps.get(1))
            .or(caps.get(3))
            .map(|m| m.as_str())
            .unwrap_or("");
        if local == import_name {
            return Ok(caps.get(4).ok_or(())?.as_str().to_string());
        }
    }
    Err(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_mutation_and_public_type() {
        let body = "publicProcedure.input(z.object({})).mutation(async ({ input }) => { await db.user.create({ data: input }); })";
        assert_eq!(classify_kind(body), RpcProcedureKind::Mutation);
        assert_eq!(classify_type("public"), RpcProcedureType::Public);
    }

    #[test]
    fn walks_flat_router_entries() {
        let text = "export const userRouter = router({\n  create: publicProcedure.mutation(() => {}),\n  list: protectedProcedure.query(() => {}),\n});\n";
        let entries = walk_router_entries(text);
        assert_eq!(entries.len(), 2);
    }
}
