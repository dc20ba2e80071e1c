//! Small cross-cutting traits shared by the engine.

mod cancellation;
mod progress;

pub use cancellation::{Cancellable, CancellationToken};
pub use progress::ProgressCallback;
