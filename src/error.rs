//! Error types for the payslip engine.
//!
//! Errors are split by blast radius. [`EngineError`] and [`SchemaError`] abort a
//! whole run; [`RowError`], [`RenderError`] and most [`DispatchError`] variants are
//! captured into a single record's outcome and never stop the batch.

use thiserror::Error;

/// The main error type for batch-fatal and configuration failures.
///
/// # Example
///
/// ```
/// use payslip_engine::error::EngineError;
///
/// let error = EngineError::ConfigNotFound {
///     path: "/missing/profile.json".to_string(),
/// };
/// assert_eq!(error.to_string(), "Configuration file not found: /missing/profile.json");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// The company profile is missing a required value.
    #[error("Invalid company profile field '{field}': {message}")]
    InvalidProfile {
        /// The offending field.
        field: String,
        /// What was wrong with it.
        message: String,
    },

    /// An engine setting is out of range.
    #[error("Invalid setting '{field}': {message}")]
    InvalidSettings {
        /// The offending setting.
        field: String,
        /// What was wrong with it.
        message: String,
    },

    /// The input dataset could not be read as a table.
    #[error("Failed to read dataset: {message}")]
    Dataset {
        /// A description of the read error.
        message: String,
    },

    /// The dataset does not satisfy the column schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

/// Dataset-level schema violations. Any of these aborts the batch before rendering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// One or more required columns are absent.
    #[error("Missing required columns: {}", .columns.join(", "))]
    MissingColumns {
        /// Every missing column, in schema order.
        columns: Vec<String>,
    },

    /// The same header appears more than once, so cells cannot be attributed.
    #[error("Duplicate column in header: {column}")]
    DuplicateColumn {
        /// The repeated header name.
        column: String,
    },

    /// The dataset has a header row but no data rows.
    #[error("Dataset contains no data rows")]
    NoDataRows,
}

/// What went wrong with a single cell or row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowErrorKind {
    /// A required value is empty.
    #[error("value is required")]
    MissingValue,
    /// The email does not match the address grammar.
    #[error("invalid email address '{value}'")]
    InvalidEmail {
        /// The rejected address.
        value: String,
    },
    /// The cell bytes are not valid UTF-8.
    #[error("value is not valid UTF-8 text")]
    InvalidEncoding,
    /// A numeric column holds something that is not a number.
    #[error("expected a number, got '{value}'")]
    NotNumeric {
        /// The rejected cell content.
        value: String,
    },
    /// A numeric column holds a negative number.
    #[error("negative value {value} is not allowed")]
    Negative {
        /// The rejected cell content.
        value: String,
    },
    /// The employee id was already used by an earlier row.
    #[error("duplicate employee id '{employee_id}'")]
    DuplicateEmployee {
        /// The repeated id.
        employee_id: String,
    },
    /// Net pay disagrees with gross income minus deductions beyond the tolerance.
    #[error("net pay {net_pay} differs from {gross_income} - {total_deductions}")]
    InconsistentTotals {
        /// Gross income on the row.
        gross_income: String,
        /// Total deductions on the row.
        total_deductions: String,
        /// Net pay on the row.
        net_pay: String,
    },
}

/// A row-scoped validation failure. Excludes the row from rendering only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("row {row}, column '{column}': {kind}")]
pub struct RowError {
    /// Zero-based data row index (header excluded).
    pub row: usize,
    /// The column the error refers to.
    pub column: String,
    /// The failure.
    pub kind: RowErrorKind,
}

/// A record-scoped rendering failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The company logo could not be decoded as PNG or JPEG.
    #[error("Failed to decode logo image: {message}")]
    LogoDecode {
        /// Decoder message.
        message: String,
    },

    /// A text field holds a character the document font cannot encode.
    #[error("Field '{field}' contains unsupported character '{character}'")]
    UnsupportedCharacter {
        /// The field being laid out.
        field: String,
        /// The first character that could not be encoded.
        character: char,
    },

    /// A section runs into the acknowledgement block at the bottom of the page.
    #[error("Section '{section}' does not fit on the page")]
    LayoutOverflow {
        /// The section that overflowed.
        section: String,
    },

    /// The document could not be serialized.
    #[error("Failed to write document: {message}")]
    Pdf {
        /// Writer message.
        message: String,
    },
}

/// Classified mail delivery failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The server rejected the credentials. Batch-fatal for all pending sends.
    #[error("Authentication failed: {message}")]
    Auth {
        /// Server response.
        message: String,
    },

    /// The server refused this recipient or message.
    #[error("Recipient '{address}' rejected: {message}")]
    AddressRejected {
        /// The refused address.
        address: String,
        /// Server response.
        message: String,
    },

    /// Connection, TLS, or timeout failure. Retried with backoff.
    #[error("Network error: {message}")]
    TransientNetwork {
        /// Underlying failure.
        message: String,
    },

    /// The server asked us to slow down. Retried with a longer backoff.
    #[error("Rate limited: {message}")]
    RateLimited {
        /// Server response.
        message: String,
    },

    /// The sending account exhausted its quota. Batch-fatal for all pending sends.
    #[error("Sending quota exceeded: {message}")]
    QuotaExceeded {
        /// Server response.
        message: String,
    },

    /// The message could not be assembled.
    #[error("Invalid message: {message}")]
    InvalidMessage {
        /// Builder message.
        message: String,
    },
}

impl DispatchError {
    /// Returns true if another attempt at the same send could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DispatchError::TransientNetwork { .. } | DispatchError::RateLimited { .. }
        )
    }

    /// Returns true if no further send in this batch can succeed.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(
            self,
            DispatchError::Auth { .. } | DispatchError::QuotaExceeded { .. }
        )
    }
}
