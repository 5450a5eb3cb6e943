//! Employee payroll record and its line items.
//!
//! An [`EmployeeRecord`] is one validated payroll row. Required totals are always
//! present; itemized earnings and deductions come from a fixed allow-list of
//! [`LineItem`]s and appear in the record only when their column is in the dataset.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which side of the payslip a line item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemKind {
    /// Paid to the employee.
    Earning,
    /// Withheld from the employee.
    Deduction,
}

/// A recognised optional earning or deduction.
///
/// Declaration order is the order in which items are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItem {
    /// Regular hours worked.
    RegularPay,
    /// Regular overtime.
    RegularOvertime,
    /// Work on legal holidays.
    LegalHoliday,
    /// Work on special holidays.
    SpecialHoliday,
    /// Night differential.
    NightDifferential,
    /// Offset hours.
    Offset,
    /// Paid leave.
    PaidLeave,
    /// Positive adjustment to earnings.
    EarningsAdjustment,
    /// Allowance paid this period.
    Allowance,
    /// 13th month pay.
    ThirteenthMonthPay,
    /// Other earnings.
    OtherEarnings,
    /// Pag-IBIG fund contribution.
    PagibigContribution,
    /// PhilHealth contribution.
    PhilhealthContribution,
    /// SSS contribution.
    SssContribution,
    /// Pag-IBIG loan repayment.
    PagibigLoan,
    /// SSS loan repayment.
    SssLoan,
    /// Withholding tax.
    WithholdingTax,
    /// Adjustment deducted this period.
    DeductionsAdjustment,
    /// Other deductions.
    OtherDeductions,
}

impl LineItem {
    /// Every line item, in print order.
    pub const ALL: [LineItem; 19] = [
        LineItem::RegularPay,
        LineItem::RegularOvertime,
        LineItem::LegalHoliday,
        LineItem::SpecialHoliday,
        LineItem::NightDifferential,
        LineItem::Offset,
        LineItem::PaidLeave,
        LineItem::EarningsAdjustment,
        LineItem::Allowance,
        LineItem::ThirteenthMonthPay,
        LineItem::OtherEarnings,
        LineItem::PagibigContribution,
        LineItem::PhilhealthContribution,
        LineItem::SssContribution,
        LineItem::PagibigLoan,
        LineItem::SssLoan,
        LineItem::WithholdingTax,
        LineItem::DeductionsAdjustment,
        LineItem::OtherDeductions,
    ];

    /// Returns whether this item is an earning or a deduction.
    pub fn kind(self) -> LineItemKind {
        match self {
            LineItem::RegularPay
            | LineItem::RegularOvertime
            | LineItem::LegalHoliday
            | LineItem::SpecialHoliday
            | LineItem::NightDifferential
            | LineItem::Offset
            | LineItem::PaidLeave
            | LineItem::EarningsAdjustment
            | LineItem::Allowance
            | LineItem::ThirteenthMonthPay
            | LineItem::OtherEarnings => LineItemKind::Earning,
            _ => LineItemKind::Deduction,
        }
    }

    /// The label printed on the payslip.
    pub fn label(self) -> &'static str {
        match self {
            LineItem::RegularPay => "Regular Hours",
            LineItem::RegularOvertime => "Regular OT",
            LineItem::LegalHoliday => "Legal Holiday",
            LineItem::SpecialHoliday => "Special Holiday",
            LineItem::NightDifferential => "Total Night Diff.",
            LineItem::Offset => "Offset",
            LineItem::PaidLeave => "Paid Leave",
            LineItem::EarningsAdjustment => "Adjustment",
            LineItem::Allowance => "Allowance",
            LineItem::ThirteenthMonthPay => "13th Month Pay",
            LineItem::OtherEarnings => "Others",
            LineItem::PagibigContribution => "Pag-ibig Contribution",
            LineItem::PhilhealthContribution => "Philhealth Contribution",
            LineItem::SssContribution => "SSS Contribution",
            LineItem::PagibigLoan => "Pag-ibig Loan",
            LineItem::SssLoan => "SSS Loan",
            LineItem::WithholdingTax => "Withholding Tax",
            LineItem::DeductionsAdjustment => "Adjustment",
            LineItem::OtherDeductions => "Others",
        }
    }

    /// The dataset column holding the amount.
    pub fn amount_column(self) -> &'static str {
        match self {
            LineItem::RegularPay => "regularAmount",
            LineItem::RegularOvertime => "regularOtAmount",
            LineItem::LegalHoliday => "legalHolidayAmount",
            LineItem::SpecialHoliday => "specialHolidayAmount",
            LineItem::NightDifferential => "nightDiffAmount",
            LineItem::Offset => "offsetAmount",
            LineItem::PaidLeave => "paidLeaveAmount",
            LineItem::EarningsAdjustment => "adjustmentEarnings",
            LineItem::Allowance => "allowance",
            LineItem::ThirteenthMonthPay => "thirteenthMonthPay",
            LineItem::OtherEarnings => "othersEarnings",
            LineItem::PagibigContribution => "pagibigContribution",
            LineItem::PhilhealthContribution => "philhealthContribution",
            LineItem::SssContribution => "sssContribution",
            LineItem::PagibigLoan => "pagibigLoan",
            LineItem::SssLoan => "sssLoan",
            LineItem::WithholdingTax => "withholdingTax",
            LineItem::DeductionsAdjustment => "adjustmentDeductions",
            LineItem::OtherDeductions => "othersDeductions",
        }
    }

    /// The dataset column holding the hours, for time-based earnings.
    pub fn hours_column(self) -> Option<&'static str> {
        match self {
            LineItem::RegularPay => Some("regularHours"),
            LineItem::RegularOvertime => Some("regularOtHours"),
            LineItem::LegalHoliday => Some("legalHolidayHours"),
            LineItem::SpecialHoliday => Some("specialHolidayHours"),
            LineItem::NightDifferential => Some("nightDiffHours"),
            LineItem::Offset => Some("offsetHours"),
            LineItem::PaidLeave => Some("paidLeaveHours"),
            _ => None,
        }
    }
}

/// The amount (and hours, where applicable) of one line item on one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineAmount {
    /// Money amount. Zero when the cell was empty.
    pub amount: Decimal,
    /// Hours, when the dataset carries an hours column for this item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<Decimal>,
}

impl LineAmount {
    /// Returns true if neither the amount nor the hours carry a value.
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero() && self.hours.is_none_or(|h| h.is_zero())
    }
}

/// One validated payroll row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    /// Employee identifier. Non-empty.
    pub employee_id: String,
    /// Display name.
    pub name: String,
    /// Recipient address. Matches the address grammar.
    pub email: String,
    /// Pay period label, e.g. "Jan 1-15, 2025".
    pub pay_period: String,
    /// Department or position, when the dataset has the column.
    #[serde(default)]
    pub position: Option<String>,
    /// Basic salary shown in the identity block, when present.
    #[serde(default)]
    pub basic_salary: Option<Decimal>,
    /// Monthly allowance shown in the identity block, when present.
    #[serde(default)]
    pub monthly_allowance: Option<Decimal>,
    /// Gross income as computed upstream.
    pub gross_income: Decimal,
    /// Total deductions as computed upstream.
    pub total_deductions: Decimal,
    /// Net pay as computed upstream.
    pub net_pay: Decimal,
    /// Optional line items whose columns exist in the dataset.
    #[serde(default)]
    pub line_items: BTreeMap<LineItem, LineAmount>,
}

impl EmployeeRecord {
    /// Returns the line items of the given kind, in print order.
    pub fn items_of(&self, kind: LineItemKind) -> impl Iterator<Item = (LineItem, &LineAmount)> {
        self.line_items
            .iter()
            .filter(move |(item, _)| item.kind() == kind)
            .map(|(item, amount)| (*item, amount))
    }

    /// Returns `net_pay - (gross_income - total_deductions)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use payslip_engine::models::EmployeeRecord;
    /// use rust_decimal::Decimal;
    ///
    /// let record = EmployeeRecord {
    ///     employee_id: "E1".to_string(),
    ///     name: "Jane Doe".to_string(),
    ///     email: "jane@x.com".to_string(),
    ///     pay_period: "Jan 1-15, 2025".to_string(),
    ///     position: None,
    ///     basic_salary: None,
    ///     monthly_allowance: None,
    ///     gross_income: Decimal::from(1000),
    ///     total_deductions: Decimal::from(100),
    ///     net_pay: Decimal::from(900),
    ///     line_items: Default::default(),
    /// };
    /// assert!(record.net_pay_discrepancy().is_zero());
    /// ```
    pub fn net_pay_discrepancy(&self) -> Decimal {
        self.net_pay - (self.gross_income - self.total_deductions)
    }
}
