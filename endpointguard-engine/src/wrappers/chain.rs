//! Phase A — wrapper-chain discovery (spec §4.6).
//!
//! Extracts the ordered HOF chain from `export (const|let|var) METHOD = <expr>`
//! and `export default <expr>`: `withA(withB(handler))` ⇒ `[withA, withB]`.

use std::sync::LazyLock;

use regex::Regex;

/// Control-flow and standard-library names that stop chain extraction —
/// these are never wrappers, even when call-shaped.
const SKIP_LIST: &[&str] = &["if", "switch", "async", "await", "function", "NextResponse", "Response"];

static EXPORT_BINDING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"export\s+(?:const|let|var)\s+(GET|POST|PUT|PATCH|DELETE)\s*=\s*(.+?);?\s*$")
        .expect("static export-binding pattern")
});

static EXPORT_DEFAULT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"export\s+default\s+(.+?);?\s*$").expect("static export-default pattern"));

static LEADING_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([A-Za-z_$][\w$]*)\s*\(").expect("static leading-call pattern"));

#[derive(Debug, Clone)]
pub struct WrapperChain {
    pub method: Option<String>,
    pub chain: Vec<String>,
}

/// Extract every exported handler binding's wrapper chain from a route
/// file's full text.
pub fn extract_chains(text: &str) -> Vec<WrapperChain> {
    let mut chains = Vec::new();
    for line in text.lines() {
        if let Some(caps) = EXPORT_BINDING.captures(line) {
            let method = caps[1].to_string();
            let expr = &caps[2];
            chains.push(WrapperChain {
                method: Some(method),
                chain: extract_chain_from_expr(expr),
            });
        } else if let Some(caps) = EXPORT_DEFAULT.captures(line) {
            chains.push(WrapperChain {
                method: None,
                chain: extract_chain_from_expr(&caps[1]),
            });
        }
    }
    chains
}

fn extract_chain_from_expr(expr: &str) -> Vec<String> {
    let mut chain = Vec::new();
    let mut remaining = expr.trim();
    loop {
        let Some(caps) = LEADING_CALL.captures(remaining) else {
            break;
        };
        let name = caps[1].to_string();
        if SKIP_LIST.contains(&name.as_str()) {
            break;
        }
        chain.push(name);
        let after_paren = &remaining[caps[0].len()..];
        remaining = after_paren.trim();
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_single_wrapper() {
        let chains = extract_chains("export const POST = withWorkspace(handler);");
        assert_eq!(chains[0].chain, vec!["withWorkspace".to_string()]);
        assert_eq!(chains[0].method.as_deref(), Some("POST"));
    }

    #[test]
    fn extracts_nested_wrapper_chain() {
        let chains = extract_chains("export const POST = withA(withB(handler));");
        assert_eq!(chains[0].chain, vec!["withA".to_string(), "withB".to_string()]);
    }

    #[test]
    fn stops_at_reserved_identifiers() {
        let chains = extract_chains("export default async function(req) { return NextResponse.json({}); }");
        assert!(chains[0].chain.is_empty());
    }

    #[test]
    fn handles_bare_handler_with_no_wrapper() {
        let chains = extract_chains("export const GET = handler;");
        assert!(chains[0].chain.is_empty());
    }
}
