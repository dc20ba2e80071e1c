//! Parse-result shapes shared across the engine (spec §9: "syntax tree
//! access via a pluggable parser" — body analysis needs only enough
//! structure to locate a symbol's body and iterate identifier references).

use tree_sitter::Tree;

#[derive(Debug, Clone, Copy, Default)]
pub struct Range {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub name: String,
    pub range: Range,
    /// Byte offsets into the source this function was parsed from.
    pub start_byte: usize,
    pub end_byte: usize,
    pub is_exported: bool,
}

#[derive(Debug, Clone)]
pub struct ImportInfo {
    pub source: String,
    pub named: Vec<(String, Option<String>)>,
    pub default: Option<String>,
    pub namespace: Option<String>,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub struct ExportInfo {
    pub name: String,
    pub is_default: bool,
    pub from_source: Option<String>,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub struct CallSite {
    pub callee: String,
    pub receiver: Option<String>,
    pub range: Range,
}

/// Output of parsing one source file. The tree itself is retained so
/// callers needing precise body isolation (Phase C, §4.6) can re-walk it.
pub struct ParseResult {
    pub tree: Option<Tree>,
    pub source: String,
    pub functions: Vec<FunctionInfo>,
    pub imports: Vec<ImportInfo>,
    pub exports: Vec<ExportInfo>,
    pub calls: Vec<CallSite>,
}

impl ParseResult {
    pub fn empty(source: String) -> Self {
        Self {
            tree: None,
            source,
            functions: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            calls: Vec::new(),
        }
    }

    pub fn line_of(&self, byte_offset: usize) -> u32 {
        self.source[..byte_offset.min(self.source.len())]
            .bytes()
            .filter(|&b| b == b'\n')
            .count() as u32
            + 1
    }
}
