//! TypeScript/JavaScript parsing via tree-sitter.
//!
//! Grounded on the teacher's native tree-sitter parser: one `Parser` plus a
//! small set of compiled queries, reused across files.

use tree_sitter::{Node, Parser, Query, QueryCursor};

use endpointguard_core::errors::ParseError;

use super::types::{CallSite, ExportInfo, FunctionInfo, ImportInfo, ParseResult, Range};

pub struct TypeScriptParser {
    parser: Parser,
    function_query: Query,
    import_query: Query,
    export_query: Query,
    call_query: Query,
}

impl TypeScriptParser {
    pub fn new() -> Result<Self, ParseError> {
        let mut parser = Parser::new();
        let language = tree_sitter_typescript::LANGUAGE_TSX;
        parser
            .set_language(&language.into())
            .map_err(|e| ParseError::LanguageSetup(e.to_string()))?;

        let function_query = Query::new(
            &language.into(),
            r#"
            (function_declaration name: (identifier) @name) @function
            (variable_declarator
                name: (identifier) @name
                value: [(arrow_function) (function_expression)] @function)
            (pair
                key: (property_identifier) @name
                value: [(arrow_function) (function_expression)] @function)
            "#,
        )
        .map_err(|e| ParseError::LanguageSetup(e.to_string()))?;

        let import_query = Query::new(
            &language.into(),
            r#"
            (import_statement
                (import_clause
                    (identifier)? @default
                    (named_imports (import_specifier
                        name: (identifier) @named
                        alias: (identifier)? @alias))*
                    (namespace_import (identifier) @namespace)?
                )?
                source: (string (string_fragment) @source)
            ) @import
            "#,
        )
        .map_err(|e| ParseError::LanguageSetup(e.to_string()))?;

        let export_query = Query::new(
            &language.into(),
            r#"
            (export_statement
                (export_clause (export_specifier name: (identifier) @name))
                source: (string (string_fragment) @source)?
            ) @export
            (export_statement
                declaration: [
                    (function_declaration name: (identifier) @decl_name)
                    (lexical_declaration (variable_declarator name: (identifier) @decl_name))
                ]
            ) @export
            (export_statement "default" (identifier) @default_name) @export
            "#,
        )
        .map_err(|e| ParseError::LanguageSetup(e.to_string()))?;

        let call_query = Query::new(
            &language.into(),
            r#"
            (call_expression
                function: [
                    (identifier) @callee
                    (member_expression
                        object: (_) @receiver
                        property: (property_identifier) @callee)
                ]
            ) @call
            "#,
        )
        .map_err(|e| ParseError::LanguageSetup(e.to_string()))?;

        Ok(Self {
            parser,
            function_query,
            import_query,
            export_query,
            call_query,
        })
    }

    pub fn parse(&mut self, source: &str) -> ParseResult {
        let tree = match self.parser.parse(source, None) {
            Some(t) => t,
            None => return ParseResult::empty(source.to_string()),
        };

        let mut result = ParseResult::empty(source.to_string());
        let root = tree.root_node();
        let bytes = source.as_bytes();

        self.extract_functions(&root, bytes, &mut result);
        self.extract_imports(&root, bytes, &mut result);
        self.extract_exports(&root, bytes, &mut result);
        self.extract_calls(&root, bytes, &mut result);

        result.tree = Some(tree);
        result
    }

    fn extract_functions(&self, root: &Node, source: &[u8], result: &mut ParseResult) {
        let mut cursor = QueryCursor::new();
        let matches = cursor.matches(&self.function_query, *root, source);
        for m in matches {
            let mut name = String::new();
            let mut func_node: Option<Node> = None;
            for capture in m.captures {
                let capture_name = self.function_query.capture_names()[capture.index as usize];
                match capture_name {
                    "name" => name = capture.node.utf8_text(source).unwrap_or("").to_string(),
                    "function" => func_node = Some(capture.node),
                    _ => {}
                }
            }
            if let (false, Some(node)) = (name.is_empty(), func_node) {
                result.functions.push(FunctionInfo {
                    name,
                    range: node_range(&node),
                    start_byte: node.start_byte(),
                    end_byte: node.end_byte(),
                    is_exported: false,
                });
            }
        }
    }

    fn extract_imports(&self, root: &Node, source: &[u8], result: &mut ParseResult) {
        let mut cursor = QueryCursor::new();
        let matches = cursor.matches(&self.import_query, *root, source);
        for m in matches {
            let mut import_source = String::new();
            let mut named = Vec::new();
            let mut default = None;
            let mut namespace = None;
            let mut range = Range::default();
            let mut pending_named: Option<String> = None;
            for capture in m.captures {
                let capture_name = self.import_query.capture_names()[capture.index as usize];
                let text = capture.node.utf8_text(source).unwrap_or("").to_string();
                match capture_name {
                    "source" => import_source = text,
                    "named" => {
                        if let Some(prev) = pending_named.take() {
                            named.push((prev, None));
                        }
                        pending_named = Some(text);
                    }
                    "alias" => {
                        if let Some(prev) = pending_named.take() {
                            named.push((prev, Some(text)));
                        }
                    }
                    "default" => default = Some(text),
                    "namespace" => namespace = Some(text),
                    "import" => range = node_range(&capture.node),
                    _ => {}
                }
            }
            if let Some(prev) = pending_named.take() {
                named.push((prev, None));
            }
            if !import_source.is_empty() {
                result.imports.push(ImportInfo {
                    source: import_source,
                    named,
                    default,
                    namespace,
                    line: range.start_line,
                });
            }
        }
        extract_require_imports(root, source, result);
    }

    fn extract_exports(&self, root: &Node, source: &[u8], result: &mut ParseResult) {
        let mut cursor = QueryCursor::new();
        let matches = cursor.matches(&self.export_query, *root, source);
        for m in matches {
            let mut names = Vec::new();
            let mut is_default = false;
            let mut from_source = None;
            let mut range = Range::default();
            for capture in m.captures {
                let capture_name = self.export_query.capture_names()[capture.index as usize];
                let text = capture.node.utf8_text(source).unwrap_or("").to_string();
                match capture_name {
                    "name" | "decl_name" => names.push(text),
                    "default_name" => {
                        is_default = true;
                        names.push(text);
                    }
                    "source" => from_source = Some(text),
                    "export" => range = node_range(&capture.node),
                    _ => {}
                }
            }
            for name in names {
                result.exports.push(ExportInfo {
                    name,
                    is_default,
                    from_source: from_source.clone(),
                    line: range.start_line,
                });
            }
        }
    }

    fn extract_calls(&self, root: &Node, source: &[u8], result: &mut ParseResult) {
        let mut cursor = QueryCursor::new();
        let matches = cursor.matches(&self.call_query, *root, source);
        for m in matches {
            let mut callee = String::new();
            let mut receiver = None;
            let mut range = Range::default();
            for capture in m.captures {
                let capture_name = self.call_query.capture_names()[capture.index as usize];
                let text = capture.node.utf8_text(source).unwrap_or("").to_string();
                match capture_name {
                    "callee" => callee = text,
                    "receiver" => receiver = Some(text),
                    "call" => range = node_range(&capture.node),
                    _ => {}
                }
            }
            if !callee.is_empty() {
                result.calls.push(CallSite { callee, receiver, range });
            }
        }
    }
}

/// CommonJS `require()` isn't covered by the import query; walked
/// textually the same way the teacher's parser falls back for it.
fn extract_require_imports(root: &Node, source: &[u8], result: &mut ParseResult) {
    let mut stack = vec![*root];
    while let Some(node) = stack.pop() {
        if node.kind() == "variable_declarator" {
            let text = node.utf8_text(source).unwrap_or("");
            if let Some(require_start) = text.find("require(") {
                let after = &text[require_start + 8..];
                if let Some(quote_idx) = after.find(['"', '\'']) {
                    let quote_char = after.as_bytes()[quote_idx] as char;
                    let path_start = quote_idx + 1;
                    if let Some(end) = after[path_start..].find(quote_char) {
                        let module_path = after[path_start..path_start + end].to_string();
                        result.imports.push(ImportInfo {
                            source: module_path,
                            named: Vec::new(),
                            default: None,
                            namespace: None,
                            line: node_range(&node).start_line,
                        });
                    }
                }
            }
        }
        let mut cursor = node.walk();
        if cursor.goto_first_child() {
            loop {
                stack.push(cursor.node());
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
        }
    }
}

fn node_range(node: &Node) -> Range {
    Range {
        start_line: node.start_position().row as u32 + 1,
        start_column: node.start_position().column as u32,
        end_line: node.end_position().row as u32 + 1,
        end_column: node.end_position().column as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_function_declaration() {
        let mut parser = TypeScriptParser::new().unwrap();
        let result = parser.parse("function hello(name) { console.log(name); }");
        assert_eq!(result.functions.len(), 1);
        assert_eq!(result.functions[0].name, "hello");
    }

    #[test]
    fn parses_arrow_function_binding() {
        let mut parser = TypeScriptParser::new().unwrap();
        let result = parser.parse("const withAuth = (handler) => { return handler; };");
        assert_eq!(result.functions.len(), 1);
        assert_eq!(result.functions[0].name, "withAuth");
    }

    #[test]
    fn parses_named_import() {
        let mut parser = TypeScriptParser::new().unwrap();
        let result = parser.parse("import { getSession } from './auth';");
        assert_eq!(result.imports.len(), 1);
        assert_eq!(result.imports[0].source, "./auth");
        assert!(result.imports[0].named.iter().any(|(n, _)| n == "getSession"));
    }

    #[test]
    fn parses_calls_with_receiver() {
        let mut parser = TypeScriptParser::new().unwrap();
        let result = parser.parse("db.user.create({ data: body });");
        assert!(result.calls.iter().any(|c| c.callee == "create"));
    }
}
