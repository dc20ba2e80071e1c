//! Shared types for the endpointguard protection-inference pipeline:
//! severity/confidence scales, configuration schema, waiver and baseline
//! file formats, error enums, and small cross-cutting traits. The pipeline
//! itself lives in `endpointguard-engine`.

pub mod baseline;
pub mod config;
pub mod errors;
pub mod model;
pub mod traits;
pub mod waiver;

pub use baseline::{Baseline, BaselineDiff};
pub use config::Config;
pub use errors::EngineError;
pub use model::{Confidence, Severity};
pub use traits::{Cancellable, CancellationToken, ProgressCallback};
pub use waiver::Waiver;
