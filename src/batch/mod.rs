//! Batch processing of payroll datasets.
//!
//! [`BatchOrchestrator::run`] validates a dataset, renders one payslip per valid
//! row on a bounded worker pool and, in live mode, delivers each document over a
//! single mail session. Every row produces exactly one
//! [`RecordOutcome`](crate::models::RecordOutcome) in the returned
//! [`BatchReport`](crate::models::BatchReport).

mod orchestrator;
mod progress;

pub use orchestrator::BatchOrchestrator;
pub use progress::{NoProgress, ProgressObserver};
