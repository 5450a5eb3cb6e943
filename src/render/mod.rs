//! Payslip rendering.
//!
//! Turns one validated [`EmployeeRecord`] plus the [`CompanyProfile`] into a
//! single-page landscape A4 PDF held in memory. Rendering is pure: the same
//! inputs always produce byte-identical output.
//!
//! # Example
//!
//! ```
//! use payslip_engine::models::{CompanyProfile, EmployeeRecord, MailCredentials};
//! use payslip_engine::render::PayslipRenderer;
//! use rust_decimal::Decimal;
//!
//! let record = EmployeeRecord {
//!     employee_id: "E1".to_string(),
//!     name: "Jane Doe".to_string(),
//!     email: "jane@x.com".to_string(),
//!     pay_period: "Jan 1-15, 2025".to_string(),
//!     position: None,
//!     basic_salary: None,
//!     monthly_allowance: None,
//!     gross_income: Decimal::from(1000),
//!     total_deductions: Decimal::from(100),
//!     net_pay: Decimal::from(900),
//!     line_items: Default::default(),
//! };
//! let profile = CompanyProfile {
//!     name: "Acme Corp".to_string(),
//!     footer_text: "Confidential".to_string(),
//!     document_id: None,
//!     effectivity_date: None,
//!     logo: None,
//!     mail: MailCredentials::new("hr@acme.test", "secret", "smtp.acme.test", 587),
//! };
//!
//! let artifact = PayslipRenderer::default().render(&record, &profile).unwrap();
//! assert_eq!(artifact.file_name(), "payslip_E1_Jan_1-15_2025.pdf");
//! assert!(artifact.bytes().starts_with(b"%PDF-"));
//! ```

mod document;
mod layout;
mod logo;
mod text;

use crate::error::RenderError;
use crate::models::{Artifact, CompanyProfile, EmployeeRecord, LineItem};

use layout::PayslipLayout;
use logo::LogoImage;

/// Renders payslip documents.
#[derive(Debug, Clone, Default)]
pub struct PayslipRenderer {
    pinned_line_items: Vec<LineItem>,
}

impl PayslipRenderer {
    /// Creates a renderer that prints only non-zero line items.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a renderer that always prints `items`, even when zero or absent.
    pub fn with_pinned_line_items(items: impl IntoIterator<Item = LineItem>) -> Self {
        Self {
            pinned_line_items: items.into_iter().collect(),
        }
    }

    /// Line items printed regardless of value.
    pub fn pinned_line_items(&self) -> &[LineItem] {
        &self.pinned_line_items
    }

    /// Renders one payslip.
    ///
    /// # Errors
    ///
    /// - [`RenderError::LogoDecode`] if the profile logo is not a PNG or JPEG
    /// - [`RenderError::UnsupportedCharacter`] if a printed field has a character
    ///   outside the document font's encoding
    /// - [`RenderError::LayoutOverflow`] if the footer text or line items run into the
    ///   acknowledgement block
    /// - [`RenderError::Pdf`] if the document cannot be serialized
    pub fn render(
        &self,
        record: &EmployeeRecord,
        profile: &CompanyProfile,
    ) -> Result<Artifact, RenderError> {
        let logo = profile
            .logo
            .as_deref()
            .map(LogoImage::decode)
            .transpose()?;

        let canvas = PayslipLayout {
            record,
            profile,
            pinned: &self.pinned_line_items,
            logo: logo.as_ref(),
        }
        .compose()?;

        let bytes = document::write_pdf(canvas.into_operations(), logo.as_ref())?;
        Ok(Artifact::new(artifact_file_name(record), bytes))
    }
}

/// Suggested file name for a record's payslip.
///
/// Spaces become `_`, slashes become `-`, and commas are dropped.
///
/// ```
/// # use payslip_engine::models::EmployeeRecord;
/// # use payslip_engine::render::artifact_file_name;
/// # use rust_decimal::Decimal;
/// # let record = EmployeeRecord {
/// #     employee_id: "EMP 7".into(), name: String::new(), email: String::new(),
/// #     pay_period: "01/01, 2025".into(), position: None, basic_salary: None,
/// #     monthly_allowance: None, gross_income: Decimal::ZERO,
/// #     total_deductions: Decimal::ZERO, net_pay: Decimal::ZERO, line_items: Default::default(),
/// # };
/// assert_eq!(artifact_file_name(&record), "payslip_EMP_7_01-01_2025.pdf");
/// ```
pub fn artifact_file_name(record: &EmployeeRecord) -> String {
    format!("payslip_{}_{}.pdf", record.employee_id, record.pay_period)
        .chars()
        .filter(|c| *c != ',')
        .map(|c| match c {
            ' ' => '_',
            '/' | '\\' => '-',
            other => other,
        })
        .collect()
}
