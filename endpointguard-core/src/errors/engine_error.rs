//! Top-level scan errors and non-fatal skip collection.

use super::{BaselineError, ConfigError, ParseError, ResolveError, RuleError, ScanError, WaiverError};

/// Errors that can abort a scan outright (spec §7's "configuration errors"
/// and "project-shape errors"). Aggregates subsystem errors via `From`
/// conversions, the same shape as a pipeline error in a multi-crate engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("project shape error: {0}")]
    Scan(#[from] ScanError),

    #[error("waiver file error: {0}")]
    Waiver(#[from] WaiverError),

    #[error("baseline file error: {0}")]
    Baseline(#[from] BaselineError),

    #[error("module resolution error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("rule error: {0}")]
    Rule(#[from] RuleError),

    #[error("scan cancelled")]
    Cancelled,
}

/// A file that was skipped during the scan because it could not be read or
/// parsed. Per spec §7, per-file I/O errors are logged as skipped and do not
/// fail the scan.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}
