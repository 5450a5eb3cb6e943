//! Response types for the payslip batch API.
//!
//! This module defines the JSON view of a batch report and the error response
//! structures for the HTTP API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::{BatchReport, BatchSummary, ProcessingMode, RecordOutcome, RecordStatus};

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl ApiErrorResponse {
    /// A 400 response with the given body.
    pub fn bad_request(error: ApiError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error,
        }
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::ConfigNotFound { .. }
            | EngineError::ConfigParseError { .. }
            | EngineError::InvalidProfile { .. }
            | EngineError::InvalidSettings { .. } => ApiErrorResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::with_details(
                    "CONFIG_ERROR",
                    "Configuration error",
                    error.to_string(),
                ),
            },
            EngineError::Dataset { message } => ApiErrorResponse {
                status: StatusCode::BAD_REQUEST,
                error: ApiError::with_details(
                    "INVALID_DATASET",
                    "The dataset could not be read as CSV",
                    message,
                ),
            },
            EngineError::Schema(schema) => ApiErrorResponse {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                error: ApiError::with_details(
                    "SCHEMA_ERROR",
                    schema.to_string(),
                    "The dataset does not match the required payroll columns",
                ),
            },
        }
    }
}

/// JSON view of a finished batch.
///
/// Document bytes are not included; each outcome names its artifact and size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse {
    /// Correlation id of the run.
    pub batch_id: Uuid,
    /// Mode the run used.
    pub mode: ProcessingMode,
    /// Summary counts.
    pub summary: BatchSummary,
    /// Batch-fatal delivery error, if one stopped the sends.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_failure: Option<String>,
    /// When processing started.
    pub started_at: DateTime<Utc>,
    /// When the report was assembled.
    pub finished_at: DateTime<Utc>,
    /// One entry per input row, in input order.
    pub outcomes: Vec<OutcomeResponse>,
}

/// JSON view of one record outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeResponse {
    /// Zero-based input row.
    pub row: usize,
    /// Employee id from the row.
    pub employee_id: String,
    /// Employee name from the row.
    pub name: String,
    /// Final status.
    pub status: RecordStatus,
    /// Failure cause for `*Failed` statuses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    /// Reason a `Skipped` record was not processed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    /// Rendered document file name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Rendered document size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<usize>,
    /// When the record finished.
    pub timestamp: DateTime<Utc>,
}

impl From<&RecordOutcome> for OutcomeResponse {
    fn from(outcome: &RecordOutcome) -> Self {
        Self {
            row: outcome.row,
            employee_id: outcome.employee_id.clone(),
            name: outcome.name.clone(),
            status: outcome.status,
            error_detail: outcome.error_detail.clone(),
            skip_reason: outcome.skip_reason.clone(),
            file_name: outcome.artifact.as_ref().map(|a| a.file_name().to_string()),
            size_bytes: outcome.artifact.as_ref().map(|a| a.len()),
            timestamp: outcome.timestamp,
        }
    }
}

impl From<&BatchReport> for BatchResponse {
    fn from(report: &BatchReport) -> Self {
        Self {
            batch_id: report.batch_id(),
            mode: report.mode(),
            summary: report.summary(),
            batch_failure: report.batch_failure().map(ToString::to_string),
            started_at: report.started_at(),
            finished_at: report.finished_at(),
            outcomes: report.outcomes().iter().map(OutcomeResponse::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use crate::models::Artifact;

    #[test]
    fn test_api_error_serialization() {
        let error = ApiError::new("TEST_ERROR", "Test message");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"code\":\"TEST_ERROR\""));
        assert!(json.contains("\"message\":\"Test message\""));
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_schema_error_is_unprocessable() {
        let engine_error = EngineError::Schema(SchemaError::MissingColumns {
            columns: vec!["email".to_string()],
        });
        let api_error: ApiErrorResponse = engine_error.into();
        assert_eq!(api_error.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(api_error.error.code, "SCHEMA_ERROR");
        assert!(api_error.error.message.contains("email"));
    }

    #[test]
    fn test_dataset_error_is_bad_request() {
        let engine_error = EngineError::Dataset {
            message: "unterminated quote".to_string(),
        };
        let api_error: ApiErrorResponse = engine_error.into();
        assert_eq!(api_error.status, StatusCode::BAD_REQUEST);
        assert_eq!(api_error.error.details.as_deref(), Some("unterminated quote"));
    }

    #[test]
    fn test_outcome_response_names_artifact() {
        let artifact = Artifact::new("payslip_E1_Jan.pdf", vec![0; 42]);
        let outcome = RecordOutcome::rendered(0, "E1", "Jane", artifact);
        let response = OutcomeResponse::from(&outcome);
        assert_eq!(response.file_name.as_deref(), Some("payslip_E1_Jan.pdf"));
        assert_eq!(response.size_bytes, Some(42));

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"rendered\""));
        assert!(!json.contains("error_detail"));
    }
}
