//! Batch report assembled by the orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DispatchError;

use super::{Artifact, ProcessingMode, RecordOutcome, RecordStatus};

/// Summary counts for a finished batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Records that ended `Rendered` or `Sent`.
    pub succeeded: usize,
    /// Records that ended `RenderFailed` or `SendFailed`.
    pub failed: usize,
    /// Records that ended `Skipped`.
    pub skipped: usize,
    /// All records.
    pub total: usize,
}

impl BatchSummary {
    fn tally(outcomes: &[RecordOutcome]) -> Self {
        let mut summary = BatchSummary {
            total: outcomes.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome.status {
                RecordStatus::Rendered | RecordStatus::Sent => summary.succeeded += 1,
                RecordStatus::RenderFailed | RecordStatus::SendFailed => summary.failed += 1,
                RecordStatus::Skipped => summary.skipped += 1,
            }
        }
        summary
    }
}

/// The outcome of one run, in input order.
///
/// Created once when the run completes; read-only afterwards.
#[derive(Debug, Clone)]
pub struct BatchReport {
    batch_id: Uuid,
    mode: ProcessingMode,
    outcomes: Vec<RecordOutcome>,
    summary: BatchSummary,
    batch_failure: Option<DispatchError>,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl BatchReport {
    pub(crate) fn new(
        batch_id: Uuid,
        mode: ProcessingMode,
        outcomes: Vec<RecordOutcome>,
        batch_failure: Option<DispatchError>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let summary = BatchSummary::tally(&outcomes);
        Self {
            batch_id,
            mode,
            outcomes,
            summary,
            batch_failure,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Correlation id used in this run's log events.
    pub fn batch_id(&self) -> Uuid {
        self.batch_id
    }

    /// The mode the run used.
    pub fn mode(&self) -> ProcessingMode {
        self.mode
    }

    /// One outcome per input row, in input order.
    pub fn outcomes(&self) -> &[RecordOutcome] {
        &self.outcomes
    }

    /// Summary counts.
    pub fn summary(&self) -> BatchSummary {
        self.summary
    }

    /// The batch-fatal delivery error that short-circuited sends, if any.
    pub fn batch_failure(&self) -> Option<&DispatchError> {
        self.batch_failure.as_ref()
    }

    /// When processing started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// When the report was assembled.
    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// The first artifact rendered for `employee_id`.
    pub fn artifact(&self, employee_id: &str) -> Option<&Artifact> {
        self.outcomes
            .iter()
            .filter(|o| o.employee_id == employee_id)
            .find_map(|o| o.artifact.as_ref())
    }

    /// Every rendered artifact with its employee id, in input order.
    pub fn artifacts(&self) -> impl Iterator<Item = (&str, &Artifact)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.artifact.as_ref().map(|a| (o.employee_id.as_str(), a)))
    }

    /// Exports one CSV row per outcome: employee id, name, status, error detail.
    ///
    /// The detail column is empty on success and carries the skip reason for
    /// skipped records.
    pub fn to_csv(&self) -> Result<Vec<u8>, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["employee_id", "name", "status", "error_detail"])?;
        for outcome in &self.outcomes {
            writer.write_record([
                outcome.employee_id.as_str(),
                outcome.name.as_str(),
                outcome.status.as_str(),
                outcome.cause().unwrap_or(""),
            ])?;
        }
        writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))
    }
}
