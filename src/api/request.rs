//! Request types for the payslip batch API.

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::models::ProcessingMode;
use crate::validation::RawDataset;

/// Request body for the `/batches` endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Payroll dataset as CSV text with a header row.
    pub dataset: String,
    /// Whether to deliver the rendered payslips. Defaults to a dry run.
    #[serde(default)]
    pub mode: ProcessingMode,
}

impl BatchRequest {
    /// Parses the CSV payload.
    pub fn parse_dataset(&self) -> EngineResult<RawDataset> {
        RawDataset::from_csv(self.dataset.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_defaults_to_dry_run() {
        let request: BatchRequest = serde_json::from_str(r#"{"dataset": "a,b\n1,2"}"#).unwrap();
        assert_eq!(request.mode, ProcessingMode::DryRun);
    }

    #[test]
    fn test_live_mode_deserialization() {
        let request: BatchRequest =
            serde_json::from_str(r#"{"dataset": "", "mode": "live"}"#).unwrap();
        assert_eq!(request.mode, ProcessingMode::Live);
    }

    #[test]
    fn test_parse_dataset_reads_headers() {
        let request = BatchRequest {
            dataset: "employeeId,name\nE1,Jane\n".to_string(),
            mode: ProcessingMode::DryRun,
        };
        let dataset = request.parse_dataset().unwrap();
        assert_eq!(dataset.headers(), &["employeeId".to_string(), "name".to_string()]);
        assert_eq!(dataset.row_count(), 1);
    }
}
