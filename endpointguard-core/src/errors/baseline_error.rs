//! Baseline file errors.

#[derive(Debug, thiserror::Error)]
pub enum BaselineError {
    #[error("failed to read baseline file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed baseline file {path}: {message}")]
    ParseError { path: String, message: String },
}
