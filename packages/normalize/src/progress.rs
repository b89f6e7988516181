//! Byte-level progress reporting.
//!
//! Passes over an input file report how many bytes of XML they have
//! consumed. [`ProgressCallback`] keeps the library free of any terminal
//! rendering; the CLI plugs in an `indicatif` bar.

use std::sync::Arc;

/// Receives progress updates from a pass over an input.
pub trait ProgressCallback: Send + Sync {
    /// Total input size in bytes. Not called when the size is unknown
    /// (stdin, compressed input).
    fn set_total(&self, total: u64);

    /// Bytes consumed so far.
    fn set_position(&self, pos: u64);

    /// The pass is over; `msg` summarizes it.
    fn finish(&self, msg: String);
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn set_position(&self, _pos: u64) {}
    fn finish(&self, _msg: String) {}
}

#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
