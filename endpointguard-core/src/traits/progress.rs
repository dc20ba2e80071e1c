//! Progress reporting contract.
//!
//! Per spec §5: "Progress reporting is optional: a callback `onProgress(stepName)`
//! is invoked at fixed boundaries... and MUST NOT affect semantics."

/// A callback invoked at fixed pipeline-step boundaries. Must not affect
/// scan semantics — it exists purely for caller-side UX (a spinner, a log line).
pub type ProgressCallback<'a> = Box<dyn Fn(&str) + 'a>;
