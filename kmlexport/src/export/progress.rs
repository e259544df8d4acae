//! Progress and error reporting.

/// Receives run progress.
///
/// `report` is only called while rasters are processed, once per raster,
/// with `done * 100 / total`. A run without rasters never reports.
pub trait ProgressSink {
    fn report(&self, percent: u8);

    /// Called once with the message of the error that aborted the run.
    fn fail(&self, _message: &str) {}
}

impl<F> ProgressSink for F
where
    F: Fn(u8),
{
    fn report(&self, percent: u8) {
        self(percent)
    }
}

/// Discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _percent: u8) {}
}

/// Percentage after `done` of `total` steps.
pub(crate) fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (done.min(total) * 100 / total) as u8
}
