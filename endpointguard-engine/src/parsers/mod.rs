//! Syntax-tree access for body isolation (spec §9): locate a symbol's
//! declaration, get its inner-function body, and let callers do bounded
//! textual scanning inside that body (§4.6 Phase C).

mod typescript;
mod types;

pub use typescript::TypeScriptParser;
pub use types::{CallSite, ExportInfo, FunctionInfo, ImportInfo, ParseResult, Range};

/// Slice of source text plus the line the slice starts at, used when a
/// function body is located and handed to the bounded-window textual scans
/// in wrapper introspection and rule evaluation.
pub struct BodySlice<'a> {
    pub text: &'a str,
    pub start_line: u32,
}

/// Locate the body of `symbol` within a parsed file: a function declaration,
/// a variable initializer that is an arrow/function expression, or a
/// property value in an object literal (factory pattern). Falls back to the
/// full source when no declaration is found (spec §4.6 Phase C).
pub fn locate_symbol_body<'a>(result: &'a ParseResult, symbol: &str) -> BodySlice<'a> {
    if let Some(func) = result.functions.iter().find(|f| f.name == symbol) {
        return BodySlice {
            text: &result.source[func.start_byte..func.end_byte],
            start_line: func.range.start_line,
        };
    }
    BodySlice {
        text: &result.source,
        start_line: 1,
    }
}
