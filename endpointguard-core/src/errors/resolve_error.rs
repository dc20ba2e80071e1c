//! Module resolution errors.

/// Errors that can occur while resolving an import specifier to a file, or
/// while loading a tsconfig chain.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("bare package specifier cannot be resolved: {0}")]
    BareSpecifier(String),

    #[error("no candidate file found for specifier {specifier} from {from}")]
    NotFound { specifier: String, from: String },

    #[error("tsconfig extends cycle detected starting at {0}")]
    ExtendsCycle(String),

    #[error("malformed tsconfig at {path}: {message}")]
    MalformedTsconfig { path: String, message: String },
}
