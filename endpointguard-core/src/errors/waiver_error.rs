//! Waiver file errors.

#[derive(Debug, thiserror::Error)]
pub enum WaiverError {
    #[error("failed to read waiver file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed waiver file {path}: {message}")]
    ParseError { path: String, message: String },
}
