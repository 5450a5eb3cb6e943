//! Batch Payslip Processing Engine
//!
//! This crate validates tabular payroll records, renders each one into a payslip
//! document, optionally delivers it over SMTP, and reports a per-record outcome for
//! the whole batch.

#![warn(missing_docs)]

pub mod api;
pub mod batch;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod render;
pub mod validation;
