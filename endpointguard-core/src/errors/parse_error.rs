//! Source-parsing errors.

/// Errors that can occur while parsing a source file's syntax tree.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("tree-sitter failed to produce a tree for {path}")]
    TreeUnavailable { path: String },

    #[error("failed to set tree-sitter language: {0}")]
    LanguageSetup(String),
}
