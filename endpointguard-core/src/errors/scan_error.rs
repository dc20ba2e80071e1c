//! Project detection / filesystem scan errors.

/// Errors surfaced by the project detector (spec §4.1) and the endpoint
/// discovery walk (spec §4.4). Per-file I/O failures are not represented here
/// — they are collected as [`crate::errors::SkippedFile`] instead, since a
/// scan should continue past an unreadable file.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("no package manifest found at project root")]
    NoManifest,

    #[error("framework dependency not declared in manifest")]
    FrameworkNotDeclared,

    #[error("no recognized application directory (`app` or `src/app`)")]
    NoAppDir,
}
