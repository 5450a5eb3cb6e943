//! Per-record processing outcomes.
//!
//! This module contains the [`RecordOutcome`] type written once per input row,
//! the [`RecordStage`] state machine each record moves through, and the
//! in-memory [`Artifact`] handle for rendered documents.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a run delivers documents or only renders them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// Render every document but never open a mail session.
    #[default]
    DryRun,
    /// Render and deliver every document.
    Live,
}

/// Final status of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Document rendered; terminal in dry-run mode.
    Rendered,
    /// Row was invalid or the document could not be rendered.
    RenderFailed,
    /// Document delivered.
    Sent,
    /// Document rendered but delivery failed.
    SendFailed,
    /// Record was never processed (cancelled run).
    Skipped,
}

impl RecordStatus {
    /// Returns true for the success statuses.
    pub fn is_success(self) -> bool {
        matches!(self, RecordStatus::Rendered | RecordStatus::Sent)
    }

    /// Returns true for the `*Failed` statuses.
    pub fn is_failure(self) -> bool {
        matches!(self, RecordStatus::RenderFailed | RecordStatus::SendFailed)
    }

    /// Display label used in exported reports.
    pub fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Rendered => "Rendered",
            RecordStatus::RenderFailed => "RenderFailed",
            RecordStatus::Sent => "Sent",
            RecordStatus::SendFailed => "SendFailed",
            RecordStatus::Skipped => "Skipped",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline position of a record.
///
/// ```text
/// Pending -> Validating -> RowInvalid
///                       -> Validated -> Rendering -> RenderFailed
///                                                 -> Rendered -> Sending -> SendFailed | Sent
/// ```
///
/// Any non-terminal stage may also move to `Skipped` when the run is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStage {
    /// Not yet looked at.
    Pending,
    /// Cells being checked.
    Validating,
    /// Row failed validation.
    RowInvalid,
    /// Row passed validation.
    Validated,
    /// Document being laid out.
    Rendering,
    /// Document could not be rendered.
    RenderFailed,
    /// Document rendered.
    Rendered,
    /// Document being delivered.
    Sending,
    /// Delivery failed.
    SendFailed,
    /// Delivery succeeded.
    Sent,
    /// Cancelled before completion.
    Skipped,
}

impl RecordStage {
    /// Returns true if `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: RecordStage) -> bool {
        use RecordStage::*;
        match (self, next) {
            (Pending, Validating)
            | (Validating, RowInvalid)
            | (Validating, Validated)
            | (Validated, Rendering)
            | (Rendering, RenderFailed)
            | (Rendering, Rendered)
            | (Rendered, Sending)
            | (Sending, SendFailed)
            | (Sending, Sent) => true,
            (current, Skipped) => !current.is_terminal(ProcessingMode::Live),
            _ => false,
        }
    }

    /// Returns true if a record in this stage is finished under `mode`.
    pub fn is_terminal(self, mode: ProcessingMode) -> bool {
        match self {
            RecordStage::RowInvalid
            | RecordStage::RenderFailed
            | RecordStage::SendFailed
            | RecordStage::Sent
            | RecordStage::Skipped => true,
            RecordStage::Rendered => mode == ProcessingMode::DryRun,
            _ => false,
        }
    }

    /// The reported status for a terminal stage.
    pub fn status(self) -> Option<RecordStatus> {
        match self {
            RecordStage::RowInvalid | RecordStage::RenderFailed => Some(RecordStatus::RenderFailed),
            RecordStage::Rendered => Some(RecordStatus::Rendered),
            RecordStage::SendFailed => Some(RecordStatus::SendFailed),
            RecordStage::Sent => Some(RecordStatus::Sent),
            RecordStage::Skipped => Some(RecordStatus::Skipped),
            _ => None,
        }
    }
}

/// A rendered document held in memory.
///
/// Cloning is cheap; the bytes are shared.
#[derive(Clone, PartialEq, Eq)]
pub struct Artifact {
    file_name: String,
    bytes: Arc<[u8]>,
}

impl Artifact {
    /// Wraps rendered bytes under the given file name.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Suggested file name, e.g. `payslip_E1_Jan_1-15_2025.pdf`.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The document bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size of the document in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the document is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Result of processing one input row.
///
/// Built once per row by the orchestrator and never changed afterwards.
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    /// Zero-based input row index.
    pub row: usize,
    /// Employee id from the row (may be empty for invalid rows).
    pub employee_id: String,
    /// Employee name from the row (may be empty for invalid rows).
    pub name: String,
    /// Final status.
    pub status: RecordStatus,
    /// Rendered document; absent for `RenderFailed` and for records skipped
    /// before rendering.
    pub artifact: Option<Artifact>,
    /// Failure cause; present iff the status is a `*Failed` variant.
    pub error_detail: Option<String>,
    /// Why a `Skipped` record was not processed.
    pub skip_reason: Option<String>,
    /// When the record reached its terminal state.
    pub timestamp: DateTime<Utc>,
}

impl RecordOutcome {
    fn base(row: usize, employee_id: &str, name: &str, status: RecordStatus) -> Self {
        Self {
            row,
            employee_id: employee_id.to_string(),
            name: name.to_string(),
            status,
            artifact: None,
            error_detail: None,
            skip_reason: None,
            timestamp: Utc::now(),
        }
    }

    /// A successfully rendered record (dry run).
    pub fn rendered(row: usize, employee_id: &str, name: &str, artifact: Artifact) -> Self {
        Self {
            artifact: Some(artifact),
            ..Self::base(row, employee_id, name, RecordStatus::Rendered)
        }
    }

    /// A record whose row was invalid or whose document failed to render.
    pub fn render_failed(
        row: usize,
        employee_id: &str,
        name: &str,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            error_detail: Some(detail.into()),
            ..Self::base(row, employee_id, name, RecordStatus::RenderFailed)
        }
    }

    /// A delivered record.
    pub fn sent(row: usize, employee_id: &str, name: &str, artifact: Artifact) -> Self {
        Self {
            artifact: Some(artifact),
            ..Self::base(row, employee_id, name, RecordStatus::Sent)
        }
    }

    /// A rendered record whose delivery failed.
    pub fn send_failed(
        row: usize,
        employee_id: &str,
        name: &str,
        artifact: Artifact,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            artifact: Some(artifact),
            error_detail: Some(detail.into()),
            ..Self::base(row, employee_id, name, RecordStatus::SendFailed)
        }
    }

    /// A record left unprocessed.
    pub fn skipped(row: usize, employee_id: &str, name: &str, reason: impl Into<String>) -> Self {
        Self {
            skip_reason: Some(reason.into()),
            ..Self::base(row, employee_id, name, RecordStatus::Skipped)
        }
    }

    /// The human-readable cause for any non-success status.
    pub fn cause(&self) -> Option<&str> {
        self.error_detail
            .as_deref()
            .or(self.skip_reason.as_deref())
    }
}
