//! HTTP API module for the payslip engine.
//!
//! This module exposes batch runs over HTTP: `POST /batches` returns the report
//! as JSON and `POST /batches/report.csv` returns it as CSV.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::BatchRequest;
pub use response::{ApiError, BatchResponse, OutcomeResponse};
pub use state::AppState;
