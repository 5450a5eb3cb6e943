//! Subject and body text for payslip messages.

use serde::{Deserialize, Serialize};

use crate::models::{CompanyProfile, EmployeeRecord};

const DEFAULT_SUBJECT: &str = "Payslip for {period}";

const DEFAULT_BODY: &str = "Hi {name},\n\n\
Please find attached your payslip for {period}.\n\n\
This is a system-generated email. If you have any questions, please contact HR.\n\n\
Best regards,\n\
HR Department";

/// Subject and body templates.
///
/// Recognised placeholders: `{name}`, `{period}`, `{employee_id}`, `{company}`.
/// Anything else is left as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageTemplate {
    /// Subject line template.
    pub subject: String,
    /// Plain-text body template.
    pub body: String,
}

impl Default for MessageTemplate {
    fn default() -> Self {
        Self {
            subject: DEFAULT_SUBJECT.to_string(),
            body: DEFAULT_BODY.to_string(),
        }
    }
}

impl MessageTemplate {
    /// Fills the subject for one record.
    ///
    /// # Example
    ///
    /// ```
    /// use payslip_engine::dispatch::MessageTemplate;
    /// # use payslip_engine::models::{CompanyProfile, EmployeeRecord, MailCredentials};
    /// # use rust_decimal::Decimal;
    /// # let record = EmployeeRecord {
    /// #     employee_id: "E1".into(), name: "Jane Doe".into(), email: "jane@x.com".into(),
    /// #     pay_period: "Jan 1-15, 2025".into(), position: None, basic_salary: None,
    /// #     monthly_allowance: None, gross_income: Decimal::ONE, total_deductions: Decimal::ZERO,
    /// #     net_pay: Decimal::ONE, line_items: Default::default(),
    /// # };
    /// # let profile = CompanyProfile {
    /// #     name: "Acme".into(), footer_text: String::new(), document_id: None,
    /// #     effectivity_date: None, logo: None,
    /// #     mail: MailCredentials::new("hr@acme.test", "x", "smtp.acme.test", 587),
    /// # };
    ///
    /// let template = MessageTemplate::default();
    /// assert_eq!(template.subject_for(&record, &profile), "Payslip for Jan 1-15, 2025");
    /// ```
    pub fn subject_for(&self, record: &EmployeeRecord, profile: &CompanyProfile) -> String {
        fill(&self.subject, record, profile)
    }

    /// Fills the body for one record.
    pub fn body_for(&self, record: &EmployeeRecord, profile: &CompanyProfile) -> String {
        fill(&self.body, record, profile)
    }
}

fn fill(template: &str, record: &EmployeeRecord, profile: &CompanyProfile) -> String {
    template
        .replace("{name}", &record.name)
        .replace("{period}", &record.pay_period)
        .replace("{employee_id}", &record.employee_id)
        .replace("{company}", &profile.name)
}
