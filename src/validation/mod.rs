//! Record validation.
//!
//! A [`RawDataset`] is checked against the fixed column schema in [`schema`].
//! Dataset-level problems abort with a [`SchemaError`](crate::error::SchemaError);
//! row-level problems are collected per row and never stop the batch.

mod dataset;
pub mod schema;
mod validator;

pub use dataset::RawDataset;
pub use schema::{DuplicatePolicy, REQUIRED_COLUMNS, ValidationRules};
pub use validator::{RejectedRow, ValidatedDataset, ValidatedRecord, validate};
