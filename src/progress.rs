//! Progress sinks.
//!
//! A run is split into named parts (one per store task, plus the orphan scan).
//! Each part reports how many of its units are done; rendering is left to the
//! caller.

/// Progress of one part of a run.
pub trait ProgressListener: Send + Sync {
    /// `processed` more units are done.
    fn add(&self, processed: u64);

    /// The part has finished, successfully or not.
    fn done(&self);
}

/// Hands out a listener for each part of a run.
pub trait ProgressMonitorFactory: Send + Sync {
    /// Starts a part of `total` units.
    fn part(&self, name: &str, total: u64) -> Box<dyn ProgressListener>;
}

/// Discards all progress.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentProgress;

impl ProgressListener for SilentProgress {
    fn add(&self, _processed: u64) {}

    fn done(&self) {}
}

impl ProgressMonitorFactory for SilentProgress {
    fn part(&self, _name: &str, _total: u64) -> Box<dyn ProgressListener> {
        Box::new(SilentProgress)
    }
}
