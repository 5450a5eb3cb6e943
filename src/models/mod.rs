//! Core data models for the payslip engine.
//!
//! This module contains the payroll record, company profile, per-record outcome,
//! and batch report types shared by every component.

mod employee;
mod outcome;
mod profile;
mod report;

pub use employee::{EmployeeRecord, LineAmount, LineItem, LineItemKind};
pub use outcome::{Artifact, ProcessingMode, RecordOutcome, RecordStage, RecordStatus};
pub use profile::{CompanyProfile, DEFAULT_SMTP_HOST, DEFAULT_SMTP_PORT, MailCredentials};
pub use report::{BatchReport, BatchSummary};
