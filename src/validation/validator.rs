//! Row-by-row validation of a [`RawDataset`] into [`EmployeeRecord`]s.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{RowError, RowErrorKind, SchemaError};
use crate::models::{EmployeeRecord, LineAmount, LineItem};

use super::dataset::RawDataset;
use super::schema::{
    BASIC_SALARY, DuplicatePolicy, EMAIL, EMPLOYEE_ID, GROSS_INCOME, MONTHLY_ALLOWANCE, NAME,
    NET_PAY, PAY_PERIOD, POSITION, REQUIRED_COLUMNS, TOTAL_DEDUCTIONS, ValidationRules,
};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("Invalid email regex")
});

/// A record that passed every row check, with its input row index.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRecord {
    /// Zero-based data row index.
    pub row: usize,
    /// The parsed record.
    pub record: EmployeeRecord,
}

/// A row excluded from rendering, with every error found on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    /// Zero-based data row index.
    pub row: usize,
    /// Employee id cell as read (may be empty).
    pub employee_id: String,
    /// Name cell as read (may be empty).
    pub name: String,
    /// Errors in column order. Never empty.
    pub errors: Vec<RowError>,
}

impl RejectedRow {
    /// All errors joined into one human-readable line.
    pub fn detail(&self) -> String {
        self.errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Result of validating a dataset whose schema was acceptable.
///
/// Every input row appears exactly once, either in `records` or in `rejected`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedDataset {
    records: Vec<ValidatedRecord>,
    rejected: Vec<RejectedRow>,
    total_rows: usize,
}

impl ValidatedDataset {
    /// Valid records in input order.
    pub fn records(&self) -> &[ValidatedRecord] {
        &self.records
    }

    /// Rejected rows in input order.
    pub fn rejected(&self) -> &[RejectedRow] {
        &self.rejected
    }

    /// Number of input rows.
    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    /// Splits into valid records and rejected rows.
    pub fn into_parts(self) -> (Vec<ValidatedRecord>, Vec<RejectedRow>) {
        (self.records, self.rejected)
    }
}

/// Resolved column positions for one dataset.
struct Columns {
    employee_id: usize,
    name: usize,
    email: usize,
    pay_period: usize,
    gross_income: usize,
    total_deductions: usize,
    net_pay: usize,
    position: Option<usize>,
    basic_salary: Option<usize>,
    monthly_allowance: Option<usize>,
    line_items: Vec<(LineItem, Option<usize>, Option<usize>)>,
}

impl Columns {
    /// Returns true if the validator reads the cell at `index`.
    fn reads(&self, index: usize) -> bool {
        [
            self.employee_id,
            self.name,
            self.email,
            self.pay_period,
            self.gross_income,
            self.total_deductions,
            self.net_pay,
        ]
        .contains(&index)
            || [self.position, self.basic_salary, self.monthly_allowance].contains(&Some(index))
            || self
                .line_items
                .iter()
                .any(|&(_, amount, hours)| amount == Some(index) || hours == Some(index))
    }

    fn resolve(dataset: &RawDataset) -> Result<Self, SchemaError> {
        let recognised: HashSet<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .chain([POSITION, BASIC_SALARY, MONTHLY_ALLOWANCE])
            .chain(LineItem::ALL.iter().map(|item| item.amount_column()))
            .chain(LineItem::ALL.iter().filter_map(|item| item.hours_column()))
            .collect();

        let mut seen = HashSet::new();
        for header in dataset.headers() {
            if recognised.contains(header.as_str()) && !seen.insert(header.as_str()) {
                return Err(SchemaError::DuplicateColumn {
                    column: header.clone(),
                });
            }
        }

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|column| dataset.column_index(column).is_none())
            .map(|column| column.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(SchemaError::MissingColumns { columns: missing });
        }

        let required = |name: &str| {
            dataset
                .column_index(name)
                .ok_or_else(|| SchemaError::MissingColumns {
                    columns: vec![name.to_string()],
                })
        };

        let line_items = LineItem::ALL
            .iter()
            .filter_map(|&item| {
                let amount = dataset.column_index(item.amount_column());
                let hours = item.hours_column().and_then(|c| dataset.column_index(c));
                (amount.is_some() || hours.is_some()).then_some((item, amount, hours))
            })
            .collect();

        Ok(Self {
            employee_id: required(EMPLOYEE_ID)?,
            name: required(NAME)?,
            email: required(EMAIL)?,
            pay_period: required(PAY_PERIOD)?,
            gross_income: required(GROSS_INCOME)?,
            total_deductions: required(TOTAL_DEDUCTIONS)?,
            net_pay: required(NET_PAY)?,
            position: dataset.column_index(POSITION),
            basic_salary: dataset.column_index(BASIC_SALARY),
            monthly_allowance: dataset.column_index(MONTHLY_ALLOWANCE),
            line_items,
        })
    }
}

/// Collects the errors of one row while its cells are parsed.
struct RowCheck<'a> {
    row: usize,
    cells: &'a [String],
    headers: &'a [String],
    errors: Vec<RowError>,
}

impl<'a> RowCheck<'a> {
    fn cell(&self, index: usize) -> &'a str {
        self.cells.get(index).map(|c| c.trim()).unwrap_or("")
    }

    fn fail(&mut self, index: usize, kind: RowErrorKind) {
        self.errors.push(RowError {
            row: self.row,
            column: self.headers[index].clone(),
            kind,
        });
    }

    fn required_text(&mut self, index: usize) -> String {
        let value = self.cell(index);
        if value.is_empty() {
            self.fail(index, RowErrorKind::MissingValue);
        }
        value.to_string()
    }

    fn email(&mut self, index: usize) -> String {
        let value = self.cell(index);
        if value.is_empty() {
            self.fail(index, RowErrorKind::MissingValue);
        } else if !EMAIL_PATTERN.is_match(value) {
            self.fail(
                index,
                RowErrorKind::InvalidEmail {
                    value: value.to_string(),
                },
            );
        }
        value.to_string()
    }

    /// Parses a numeric cell. Empty cells yield `None` without an error.
    fn number(&mut self, index: usize) -> Option<Decimal> {
        let raw = self.cell(index);
        if raw.is_empty() {
            return None;
        }
        let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
        match parse_decimal(&cleaned) {
            Some(value) if value < Decimal::ZERO => {
                self.fail(
                    index,
                    RowErrorKind::Negative {
                        value: raw.to_string(),
                    },
                );
                None
            }
            Some(value) => Some(value),
            None => {
                self.fail(
                    index,
                    RowErrorKind::NotNumeric {
                        value: raw.to_string(),
                    },
                );
                None
            }
        }
    }

    fn required_number(&mut self, index: usize) -> Decimal {
        if self.cell(index).is_empty() {
            self.fail(index, RowErrorKind::MissingValue);
            return Decimal::ZERO;
        }
        self.number(index).unwrap_or(Decimal::ZERO)
    }

    fn optional_number(&mut self, index: usize) -> Decimal {
        self.number(index).unwrap_or(Decimal::ZERO)
    }
}

fn parse_decimal(value: &str) -> Option<Decimal> {
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .ok()
}

/// Validates every row of `dataset` against the fixed column schema and `rules`.
///
/// Returns `Err` only for dataset-level problems (missing or duplicated
/// required columns, no data rows). Row problems are collected into
/// [`ValidatedDataset::rejected`] and never abort the batch.
///
/// # Example
///
/// ```
/// use payslip_engine::validation::{validate, RawDataset, ValidationRules};
///
/// let csv = "employeeId,name,email,payPeriod,grossIncome,totalDeductions,netPay\n\
///            E1,Jane Doe,jane@x.com,\"Jan 1-15, 2025\",1000,100,900\n\
///            E2,John Roe,not-an-email,\"Jan 1-15, 2025\",1000,100,900\n";
/// let dataset = RawDataset::from_csv(csv.as_bytes()).unwrap();
/// let validated = validate(&dataset, &ValidationRules::default()).unwrap();
///
/// assert_eq!(validated.records().len(), 1);
/// assert_eq!(validated.rejected().len(), 1);
/// assert_eq!(validated.rejected()[0].errors[0].column, "email");
/// ```
pub fn validate(
    dataset: &RawDataset,
    rules: &ValidationRules,
) -> Result<ValidatedDataset, SchemaError> {
    let columns = Columns::resolve(dataset)?;
    if dataset.row_count() == 0 {
        return Err(SchemaError::NoDataRows);
    }

    let duplicates = duplicate_rows(dataset, columns.employee_id, rules.duplicate_policy);

    let mut validated = ValidatedDataset {
        total_rows: dataset.row_count(),
        ..Default::default()
    };

    for (row, cells) in dataset.rows().iter().enumerate() {
        let mut check = RowCheck {
            row,
            cells,
            headers: dataset.headers(),
            errors: Vec::new(),
        };

        let employee_id = check.required_text(columns.employee_id);
        let name = check.required_text(columns.name);
        let email = check.email(columns.email);
        let pay_period = check.required_text(columns.pay_period);
        let gross_income = check.required_number(columns.gross_income);
        let total_deductions = check.required_number(columns.total_deductions);
        let net_pay = check.required_number(columns.net_pay);

        let position = columns
            .position
            .map(|i| check.cell(i))
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        let basic_salary = columns.basic_salary.map(|i| check.optional_number(i));
        let monthly_allowance = columns.monthly_allowance.map(|i| check.optional_number(i));

        let mut line_items = BTreeMap::new();
        for &(item, amount_col, hours_col) in &columns.line_items {
            let amount = amount_col
                .map(|i| check.optional_number(i))
                .unwrap_or(Decimal::ZERO);
            let hours = hours_col.map(|i| check.optional_number(i));
            line_items.insert(item, LineAmount { amount, hours });
        }

        for &index in dataset.undecodable_cells(row) {
            if columns.reads(index) {
                check.fail(index, RowErrorKind::InvalidEncoding);
            }
        }

        if duplicates.contains(&row) {
            check.fail(
                columns.employee_id,
                RowErrorKind::DuplicateEmployee {
                    employee_id: employee_id.clone(),
                },
            );
        }

        let record = EmployeeRecord {
            employee_id,
            name,
            email,
            pay_period,
            position,
            basic_salary,
            monthly_allowance,
            gross_income,
            total_deductions,
            net_pay,
            line_items,
        };

        if let Some(tolerance) = rules.net_pay_tolerance
            && check.errors.is_empty()
            && record.net_pay_discrepancy().abs() > tolerance
        {
            check.fail(
                columns.net_pay,
                RowErrorKind::InconsistentTotals {
                    gross_income: record.gross_income.to_string(),
                    total_deductions: record.total_deductions.to_string(),
                    net_pay: record.net_pay.to_string(),
                },
            );
        }

        if check.errors.is_empty() {
            validated.records.push(ValidatedRecord { row, record });
        } else {
            debug!(
                row = row,
                employee_id = %record.employee_id,
                errors = check.errors.len(),
                "Row rejected"
            );
            validated.rejected.push(RejectedRow {
                row,
                employee_id: record.employee_id,
                name: record.name,
                errors: check.errors,
            });
        }
    }

    Ok(validated)
}

/// Row indices rejected by the duplicate policy.
fn duplicate_rows(
    dataset: &RawDataset,
    id_column: usize,
    policy: DuplicatePolicy,
) -> HashSet<usize> {
    let mut by_id: HashMap<&str, Vec<usize>> = HashMap::new();
    for (row, cells) in dataset.rows().iter().enumerate() {
        let id = cells.get(id_column).map(|c| c.trim()).unwrap_or("");
        if !id.is_empty() {
            by_id.entry(id).or_default().push(row);
        }
    }

    let mut rejected = HashSet::new();
    for rows in by_id.values().filter(|rows| rows.len() > 1) {
        match policy {
            DuplicatePolicy::Allow => {}
            DuplicatePolicy::RejectRepeats => rejected.extend(rows.iter().skip(1)),
            DuplicatePolicy::RejectAll => rejected.extend(rows.iter()),
        }
    }
    rejected
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "employeeId,name,email,payPeriod,grossIncome,totalDeductions,netPay";

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn dataset(body: &str) -> RawDataset {
        RawDataset::from_csv(format!("{HEADER}\n{body}").as_bytes()).unwrap()
    }

    fn run(body: &str) -> ValidatedDataset {
        validate(&dataset(body), &ValidationRules::default()).unwrap()
    }

    #[test]
    fn test_valid_row_is_parsed() {
        let validated = run("E1,Jane Doe,jane@x.com,\"Jan 1-15, 2025\",1000.50,100.25,900.25\n");
        assert_eq!(validated.records().len(), 1);
        let record = &validated.records()[0].record;
        assert_eq!(record.employee_id, "E1");
        assert_eq!(record.pay_period, "Jan 1-15, 2025");
        assert_eq!(record.gross_income, dec("1000.50"));
        assert_eq!(record.net_pay, dec("900.25"));
        assert!(record.line_items.is_empty());
        assert!(record.position.is_none());
    }

    #[test]
    fn test_missing_columns_are_all_listed() {
        let raw = RawDataset::from_csv("employeeId,name,payPeriod\nE1,Jane,Jan\n".as_bytes())
            .unwrap();
        let error = validate(&raw, &ValidationRules::default()).unwrap_err();
        assert_eq!(
            error,
            SchemaError::MissingColumns {
                columns: vec![
                    "email".to_string(),
                    "grossIncome".to_string(),
                    "totalDeductions".to_string(),
                    "netPay".to_string(),
                ]
            }
        );
    }

    #[test]
    fn test_column_names_are_case_sensitive() {
        let header = HEADER.replace("employeeId", "EmployeeId");
        let raw = RawDataset::from_csv(format!("{header}\nE1,a,a@b.co,p,1,0,1\n").as_bytes())
            .unwrap();
        let error = validate(&raw, &ValidationRules::default()).unwrap_err();
        assert_eq!(
            error,
            SchemaError::MissingColumns {
                columns: vec!["employeeId".to_string()]
            }
        );
    }

    #[test]
    fn test_duplicate_required_column_is_schema_error() {
        let raw = RawDataset::from_csv(format!("{HEADER},email\n").as_bytes()).unwrap();
        let error = validate(&raw, &ValidationRules::default()).unwrap_err();
        assert_eq!(
            error,
            SchemaError::DuplicateColumn {
                column: "email".to_string()
            }
        );
    }

    #[test]
    fn test_header_only_dataset_has_no_rows() {
        let raw = RawDataset::from_csv(format!("{HEADER}\n").as_bytes()).unwrap();
        assert_eq!(
            validate(&raw, &ValidationRules::default()).unwrap_err(),
            SchemaError::NoDataRows
        );
    }

    #[test]
    fn test_malformed_email_rejects_only_that_row() {
        let validated = run(
            "E1,Jane,jane@x.com,P,1,0,1\nE2,John,john@,P,1,0,1\nE3,Ann,ann@y.org,P,1,0,1\n",
        );
        assert_eq!(validated.records().len(), 2);
        assert_eq!(validated.rejected().len(), 1);
        let rejected = &validated.rejected()[0];
        assert_eq!(rejected.row, 1);
        assert_eq!(rejected.employee_id, "E2");
        assert_eq!(
            rejected.errors[0].kind,
            RowErrorKind::InvalidEmail {
                value: "john@".to_string()
            }
        );
    }

    #[test]
    fn test_non_numeric_and_negative_values_are_row_errors() {
        let validated = run("E1,Jane,jane@x.com,P,abc,-5,1\n");
        let errors = &validated.rejected()[0].errors;
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].column, "grossIncome");
        assert!(matches!(errors[0].kind, RowErrorKind::NotNumeric { .. }));
        assert_eq!(errors[1].column, "totalDeductions");
        assert!(matches!(errors[1].kind, RowErrorKind::Negative { .. }));
    }

    #[test]
    fn test_empty_required_cells_are_missing_values() {
        let validated = run(",Jane,jane@x.com,P,,0,1\n");
        let errors = &validated.rejected()[0].errors;
        assert_eq!(errors[0].column, "employeeId");
        assert_eq!(errors[0].kind, RowErrorKind::MissingValue);
        assert_eq!(errors[1].column, "grossIncome");
        assert_eq!(errors[1].kind, RowErrorKind::MissingValue);
    }

    #[test]
    fn test_thousands_separators_and_whitespace_are_accepted() {
        let validated = run("E1,Jane, jane@x.com ,P,\" 12,500.00 \",500,\"12,000\"\n");
        let record = &validated.records()[0].record;
        assert_eq!(record.email, "jane@x.com");
        assert_eq!(record.gross_income, dec("12500.00"));
        assert_eq!(record.net_pay, dec("12000"));
    }

    #[test]
    fn test_optional_columns_default_to_zero_when_empty() {
        let header = format!("{HEADER},sssContribution,regularHours,regularAmount,position");
        let raw = RawDataset::from_csv(format!("{header}\nE1,Jane,j@x.com,P,1,0,1,,8,,\n").as_bytes())
            .unwrap();
        let validated = validate(&raw, &ValidationRules::default()).unwrap();
        let record = &validated.records()[0].record;
        assert_eq!(record.line_items.len(), 2);
        assert_eq!(record.line_items[&LineItem::SssContribution].amount, Decimal::ZERO);
        let regular = record.line_items[&LineItem::RegularPay];
        assert_eq!(regular.amount, Decimal::ZERO);
        assert_eq!(regular.hours, Some(dec("8")));
        assert!(record.position.is_none());
    }

    #[test]
    fn test_unknown_columns_are_ignored() {
        let raw = RawDataset::from_csv(
            format!("{HEADER},favouriteColour,favouriteColour\nE1,Jane,j@x.com,P,1,0,1,red,blue\n")
                .as_bytes(),
        )
        .unwrap();
        let validated = validate(&raw, &ValidationRules::default()).unwrap();
        assert_eq!(validated.records().len(), 1);
        assert!(validated.records()[0].record.line_items.is_empty());
    }

    #[test]
    fn test_duplicates_allowed_by_default() {
        let validated = run("E1,Jane,j@x.com,P,1,0,1\nE1,Jane,j@x.com,P,1,0,1\n");
        assert_eq!(validated.records().len(), 2);
    }

    #[test]
    fn test_duplicate_policy_reject_repeats() {
        let rules = ValidationRules {
            duplicate_policy: DuplicatePolicy::RejectRepeats,
            ..Default::default()
        };
        let validated = validate(
            &dataset("E1,Jane,j@x.com,P,1,0,1\nE2,Ann,a@x.com,P,1,0,1\nE1,Jane,j@x.com,P,1,0,1\n"),
            &rules,
        )
        .unwrap();
        assert_eq!(validated.records().len(), 2);
        assert_eq!(validated.rejected()[0].row, 2);
        assert!(matches!(
            validated.rejected()[0].errors[0].kind,
            RowErrorKind::DuplicateEmployee { .. }
        ));
    }

    #[test]
    fn test_duplicate_policy_reject_all() {
        let rules = ValidationRules {
            duplicate_policy: DuplicatePolicy::RejectAll,
            ..Default::default()
        };
        let validated = validate(
            &dataset("E1,Jane,j@x.com,P,1,0,1\nE2,Ann,a@x.com,P,1,0,1\nE1,Jane,j@x.com,P,1,0,1\n"),
            &rules,
        )
        .unwrap();
        assert_eq!(validated.records().len(), 1);
        assert_eq!(validated.records()[0].record.employee_id, "E2");
        assert_eq!(validated.rejected().len(), 2);
    }

    #[test]
    fn test_net_pay_tolerance() {
        let body = "E1,Jane,j@x.com,P,1000,100,900.01\nE2,Ann,a@x.com,P,1000,100,950\n";
        assert_eq!(run(body).records().len(), 2);

        let rules = ValidationRules {
            net_pay_tolerance: Some(dec("0.05")),
            ..Default::default()
        };
        let validated = validate(&dataset(body), &rules).unwrap();
        assert_eq!(validated.records().len(), 1);
        assert_eq!(validated.rejected()[0].employee_id, "E2");
        assert_eq!(validated.rejected()[0].errors[0].column, "netPay");
    }

    #[test]
    fn test_every_row_accounted_for_in_order() {
        let validated = run("E1,a,a@x.com,P,1,0,1\nE2,b,bad,P,1,0,1\nE3,c,c@x.com,P,1,0,1\n");
        assert_eq!(validated.total_rows(), 3);
        let mut rows: Vec<usize> = validated
            .records()
            .iter()
            .map(|r| r.row)
            .chain(validated.rejected().iter().map(|r| r.row))
            .collect();
        rows.sort();
        assert_eq!(rows, vec![0, 1, 2]);
        assert!(validated.records().windows(2).all(|w| w[0].row < w[1].row));
    }

    #[test]
    fn test_rejected_detail_joins_errors() {
        let validated = run("E1,Jane,bad,P,x,0,1\n");
        let detail = validated.rejected()[0].detail();
        assert!(detail.contains("column 'email'"));
        assert!(detail.contains("; "));
        assert!(detail.contains("column 'grossIncome'"));
    }

    #[test]
    fn test_undecodable_cell_rejects_only_its_row() {
        let mut csv =
            format!("{HEADER},notes\nE1,Jane,jane@x.com,P,1,0,1,ok\nE2,Ren").into_bytes();
        csv.push(0xE9);
        csv.extend_from_slice(b",ren@x.com,P,1,0,1,ok\nE3,Ann,ann@x.com,P,1,0,1,");
        csv.push(0xFF);
        csv.push(b'\n');
        let dataset = RawDataset::from_csv(csv.as_slice()).unwrap();

        let validated = validate(&dataset, &ValidationRules::default()).unwrap();

        let ids: Vec<&str> = validated
            .records()
            .iter()
            .map(|r| r.record.employee_id.as_str())
            .collect();
        assert_eq!(ids, vec!["E1", "E3"]);
        assert_eq!(validated.rejected().len(), 1);
        assert_eq!(
            validated.rejected()[0].errors,
            vec![RowError {
                row: 1,
                column: "name".to_string(),
                kind: RowErrorKind::InvalidEncoding,
            }]
        );
    }
}

