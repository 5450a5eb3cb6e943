//! Column schema and validation rules.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Employee identifier column.
pub const EMPLOYEE_ID: &str = "employeeId";
/// Employee name column.
pub const NAME: &str = "name";
/// Recipient address column.
pub const EMAIL: &str = "email";
/// Pay period label column.
pub const PAY_PERIOD: &str = "payPeriod";
/// Gross income column.
pub const GROSS_INCOME: &str = "grossIncome";
/// Total deductions column.
pub const TOTAL_DEDUCTIONS: &str = "totalDeductions";
/// Net pay column.
pub const NET_PAY: &str = "netPay";
/// Optional department/position column.
pub const POSITION: &str = "position";
/// Optional basic salary column.
pub const BASIC_SALARY: &str = "basicSalary";
/// Optional monthly allowance column.
pub const MONTHLY_ALLOWANCE: &str = "monthlyAllowance";

/// Columns every dataset must carry, in report order.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    EMPLOYEE_ID,
    NAME,
    EMAIL,
    PAY_PERIOD,
    GROSS_INCOME,
    TOTAL_DEDUCTIONS,
    NET_PAY,
];

/// How repeated employee ids are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Every row is processed.
    #[default]
    Allow,
    /// The first occurrence is processed; later ones are rejected.
    RejectRepeats,
    /// Every row sharing an id is rejected.
    RejectAll,
}

/// Tunable row rules applied on top of the fixed schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationRules {
    /// Repeated employee id handling.
    pub duplicate_policy: DuplicatePolicy,
    /// When set, rows whose net pay differs from gross minus deductions by more
    /// than this amount are rejected.
    pub net_pay_tolerance: Option<Decimal>,
}
