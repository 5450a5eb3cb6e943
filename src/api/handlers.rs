//! HTTP request handlers for the payslip batch API.

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::batch::NoProgress;
use crate::models::BatchReport;

use super::request::BatchRequest;
use super::response::{ApiError, ApiErrorResponse, BatchResponse};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/batches", post(run_batch_handler))
        .route("/batches/report.csv", post(report_csv_handler))
        .with_state(state)
}

/// Handler for POST /batches.
///
/// Runs the batch and returns the report as JSON.
async fn run_batch_handler(
    State(state): State<AppState>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Response {
    match execute(&state, payload).await {
        Ok(report) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            Json(BatchResponse::from(&report)),
        )
            .into_response(),
        Err(error) => error.into_response(),
    }
}

/// Handler for POST /batches/report.csv.
///
/// Runs the batch and returns one CSV row per outcome.
async fn report_csv_handler(
    State(state): State<AppState>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Response {
    let report = match execute(&state, payload).await {
        Ok(report) => report,
        Err(error) => return error.into_response(),
    };

    match report.to_csv() {
        Ok(csv) => (StatusCode::OK, [(header::CONTENT_TYPE, "text/csv")], csv).into_response(),
        Err(err) => {
            warn!(batch_id = %report.batch_id(), error = %err, "CSV export failed");
            ApiErrorResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::with_details("EXPORT_ERROR", "CSV export failed", err.to_string()),
            }
            .into_response()
        }
    }
}

async fn execute(
    state: &AppState,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<BatchReport, ApiErrorResponse> {
    // Generate correlation ID for request tracking
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing batch request");

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            let error = match rejection {
                JsonRejection::JsonDataError(err) => {
                    let body_text = err.body_text();
                    warn!(
                        correlation_id = %correlation_id,
                        error = %body_text,
                        "JSON data error"
                    );
                    if body_text.contains("missing field") {
                        ApiError::new("VALIDATION_ERROR", body_text)
                    } else {
                        ApiError::malformed_json(body_text)
                    }
                }
                JsonRejection::JsonSyntaxError(err) => {
                    warn!(
                        correlation_id = %correlation_id,
                        error = %err,
                        "JSON syntax error"
                    );
                    ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
                }
                JsonRejection::MissingJsonContentType(_) => {
                    ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
                }
                _ => ApiError::malformed_json("Failed to parse request body"),
            };
            return Err(ApiErrorResponse::bad_request(error));
        }
    };

    let dataset = request.parse_dataset().map_err(|err| {
        warn!(correlation_id = %correlation_id, error = %err, "Dataset unreadable");
        ApiErrorResponse::from(err)
    })?;

    let start_time = Instant::now();
    let report = state
        .orchestrator()
        .run(
            &dataset,
            state.profile(),
            request.mode,
            &mut NoProgress,
            CancellationToken::new(),
        )
        .await
        .map_err(|err| {
            warn!(correlation_id = %correlation_id, error = %err, "Batch rejected");
            ApiErrorResponse::from(err)
        })?;

    let summary = report.summary();
    info!(
        correlation_id = %correlation_id,
        batch_id = %report.batch_id(),
        total = summary.total,
        succeeded = summary.succeeded,
        duration_ms = start_time.elapsed().as_millis() as u64,
        "Batch request completed"
    );

    Ok(report)
}
