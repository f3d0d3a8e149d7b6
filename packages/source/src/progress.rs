//! Progress reporting trait for long-running fetches.
//!
//! [`ProgressCallback`] keeps the fetch layer independent of how progress
//! is rendered. The CLI supplies an `indicatif` bar; tests and library
//! callers use [`NullProgress`].

use std::sync::Arc;

/// Receives progress updates from a fetch. Must be `Send + Sync` so it can
/// be shared across concurrently running month fetches.
pub trait ProgressCallback: Send + Sync {
    /// Set the total expected units of work.
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Update the message shown next to the indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);
}

/// Ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
