//! Error handling for endpointguard.
//! One error enum per subsystem, `thiserror` only, zero `anyhow`.

pub mod config_error;
pub mod resolve_error;
pub mod parse_error;
pub mod rule_error;
pub mod scan_error;
pub mod waiver_error;
pub mod baseline_error;
pub mod engine_error;

pub use config_error::ConfigError;
pub use resolve_error::ResolveError;
pub use parse_error::ParseError;
pub use rule_error::RuleError;
pub use scan_error::ScanError;
pub use waiver_error::WaiverError;
pub use baseline_error::BaselineError;
pub use engine_error::{EngineError, SkippedFile};
