//! Progress notifications for a running batch.

use crate::models::RecordOutcome;

/// Receives one call per record as it reaches a terminal state.
///
/// Calls happen on the aggregation task, in completion order, with `completed`
/// counting up from 1 to `total`.
pub trait ProgressObserver: Send {
    /// Called after `latest` reached its terminal state.
    fn on_progress(&mut self, completed: usize, total: usize, latest: &RecordOutcome);
}

impl<F> ProgressObserver for F
where
    F: FnMut(usize, usize, &RecordOutcome) + Send,
{
    fn on_progress(&mut self, completed: usize, total: usize, latest: &RecordOutcome) {
        self(completed, total, latest)
    }
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&mut self, _completed: usize, _total: usize, _latest: &RecordOutcome) {}
}
