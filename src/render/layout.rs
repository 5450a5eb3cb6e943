//! Page layout: turns a record and profile into drawing operations.

use lopdf::Object;
use lopdf::content::Operation;
use rust_decimal::Decimal;

use crate::error::RenderError;
use crate::models::{CompanyProfile, EmployeeRecord, LineItem, LineItemKind};

use super::logo::LogoImage;
use super::text::{encode, format_amount, format_hours, text_width, wrap};

/// Landscape A4 width in points.
pub(crate) const PAGE_WIDTH: f32 = 842.0;
/// Landscape A4 height in points.
pub(crate) const PAGE_HEIGHT: f32 = 595.0;
/// Resource name of the logo XObject.
pub(crate) const LOGO_RESOURCE: &str = "Im1";

const MARGIN: f32 = 36.0;
const ROW_HEIGHT: f32 = 14.0;
const BODY_SIZE: f32 = 10.0;
const SMALL_SIZE: f32 = 8.0;
const FOOTER_WRAP: usize = 90;
const FOOTER_LEADING: f32 = 10.0;
/// Lowest baseline available above the "Received by" block.
const CONTENT_FLOOR: f32 = 124.0;

const EARNINGS_LEFT: f32 = MARGIN;
const EARNINGS_HOURS_RIGHT: f32 = 300.0;
const EARNINGS_RIGHT: f32 = 406.0;
const DEDUCTIONS_LEFT: f32 = 436.0;
const DEDUCTIONS_RIGHT: f32 = PAGE_WIDTH - MARGIN;
const CELL_PAD: f32 = 6.0;

/// Font resources registered on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Font {
    Regular,
    Bold,
}

impl Font {
    pub(crate) fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

/// Accumulates content-stream operations and the plain text they draw.
#[derive(Debug, Default)]
pub(crate) struct Canvas {
    operations: Vec<Operation>,
    #[cfg(test)]
    texts: Vec<String>,
}

impl Canvas {
    fn text(
        &mut self,
        field: &str,
        value: &str,
        x: f32,
        y: f32,
        font: Font,
        size: f32,
    ) -> Result<(), RenderError> {
        let bytes = encode(field, value)?;
        self.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![font.resource().into(), size.into()]),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new("Tj", vec![Object::string_literal(bytes)]),
            Operation::new("ET", vec![]),
        ]);
        #[cfg(test)]
        self.texts.push(value.to_string());
        Ok(())
    }

    fn text_right(
        &mut self,
        field: &str,
        value: &str,
        right: f32,
        y: f32,
        font: Font,
        size: f32,
    ) -> Result<(), RenderError> {
        self.text(field, value, right - text_width(value, size), y, font, size)
    }

    fn text_center(
        &mut self,
        field: &str,
        value: &str,
        center: f32,
        y: f32,
        font: Font,
        size: f32,
    ) -> Result<(), RenderError> {
        self.text(field, value, center - text_width(value, size) / 2.0, y, font, size)
    }

    fn cell(
        &mut self,
        field: &str,
        value: &str,
        x: f32,
        y: f32,
        font: Font,
    ) -> Result<(), RenderError> {
        self.text(field, value, x, y, font, BODY_SIZE)
    }

    fn cell_right(
        &mut self,
        field: &str,
        value: &str,
        right: f32,
        y: f32,
        font: Font,
    ) -> Result<(), RenderError> {
        self.text_right(field, value, right, y, font, BODY_SIZE)
    }

    fn rule(&mut self, x1: f32, x2: f32, y: f32, width: f32) {
        self.operations.extend([
            Operation::new("w", vec![width.into()]),
            Operation::new("m", vec![x1.into(), y.into()]),
            Operation::new("l", vec![x2.into(), y.into()]),
            Operation::new("S", vec![]),
        ]);
    }

    fn image(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width.into(),
                    0.into(),
                    0.into(),
                    height.into(),
                    x.into(),
                    y.into(),
                ],
            ),
            Operation::new("Do", vec![LOGO_RESOURCE.into()]),
            Operation::new("Q", vec![]),
        ]);
    }

    /// The drawing operations, in paint order.
    pub(crate) fn into_operations(self) -> Vec<Operation> {
        self.operations
    }

    /// Every string drawn, in paint order.
    #[cfg(test)]
    pub(crate) fn texts(&self) -> &[String] {
        &self.texts
    }
}

/// One printed line-item row.
struct ItemRow {
    label: &'static str,
    hours: Option<Decimal>,
    amount: Decimal,
}

/// Inputs for laying out a single payslip page.
pub(crate) struct PayslipLayout<'a> {
    pub record: &'a EmployeeRecord,
    pub profile: &'a CompanyProfile,
    pub pinned: &'a [LineItem],
    pub logo: Option<&'a LogoImage>,
}

impl PayslipLayout<'_> {
    /// Lays out the page top to bottom.
    pub(crate) fn compose(&self) -> Result<Canvas, RenderError> {
        let mut canvas = Canvas::default();
        let mut y = PAGE_HEIGHT - MARGIN;

        y = self.header(&mut canvas, y)?;
        y = self.identity(&mut canvas, y)?;
        y = self.tables(&mut canvas, y)?;
        self.footer_text(&mut canvas, y)?;
        self.acknowledgement(&mut canvas)?;
        self.page_foot(&mut canvas)?;

        Ok(canvas)
    }

    fn header(&self, canvas: &mut Canvas, mut y: f32) -> Result<f32, RenderError> {
        let center = PAGE_WIDTH / 2.0;
        if let Some(logo) = self.logo {
            let (width, height) = logo.fit(160.0, 48.0);
            y -= height;
            canvas.image(center - width / 2.0, y, width, height);
            y -= 8.0;
        }

        y -= 14.0;
        let name = &self.profile.name;
        canvas.text_center("company_name", name, center, y, Font::Bold, 14.0)?;
        y -= 18.0;
        canvas.text_center("title", "PAYSLIP", center, y, Font::Bold, 11.0)?;
        Ok(y - 12.0)
    }

    fn identity(&self, canvas: &mut Canvas, top: f32) -> Result<f32, RenderError> {
        let record = self.record;

        let mut left = vec![
            ("Employee Number:", "employee_id", record.employee_id.clone()),
            ("Name:", "name", record.name.clone()),
        ];
        if let Some(position) = &record.position {
            left.push(("Department/Position:", "position", position.clone()));
        }

        let mut right = vec![("Payroll Period:", "pay_period", record.pay_period.clone())];
        if let Some(basic) = record.basic_salary {
            right.push(("Basic:", "basic_salary", format_amount(basic)));
        }
        if let Some(allowance) = record.monthly_allowance {
            let allowance = format_amount(allowance);
            right.push(("Monthly Allowance:", "monthly_allowance", allowance));
        }

        let mut y = top;
        for (index, (label, field, value)) in left.iter().enumerate() {
            y = top - ROW_HEIGHT * (index as f32 + 1.0);
            canvas.cell("label", label, MARGIN, y, Font::Bold)?;
            canvas.cell(field, value, MARGIN + 120.0, y, Font::Regular)?;
        }
        for (index, (label, field, value)) in right.iter().enumerate() {
            let row_y = top - ROW_HEIGHT * (index as f32 + 1.0);
            canvas.cell("label", label, DEDUCTIONS_LEFT, row_y, Font::Bold)?;
            canvas.cell(field, value, DEDUCTIONS_LEFT + 110.0, row_y, Font::Regular)?;
            y = y.min(row_y);
        }

        y -= 8.0;
        canvas.rule(MARGIN, PAGE_WIDTH - MARGIN, y, 0.75);
        Ok(y - 6.0)
    }

    fn rows(&self, kind: LineItemKind) -> Vec<ItemRow> {
        LineItem::ALL
            .iter()
            .filter(|item| item.kind() == kind)
            .filter_map(|&item| {
                let entry = self.record.line_items.get(&item);
                let pinned = self.pinned.contains(&item);
                let has_value = entry.is_some_and(|amount| !amount.is_zero());
                (pinned || has_value).then(|| ItemRow {
                    label: item.label(),
                    hours: entry.and_then(|amount| amount.hours),
                    amount: entry.map(|amount| amount.amount).unwrap_or(Decimal::ZERO),
                })
            })
            .collect()
    }

    fn tables(&self, canvas: &mut Canvas, top: f32) -> Result<f32, RenderError> {
        let record = self.record;
        let earnings = self.rows(LineItemKind::Earning);
        let deductions = self.rows(LineItemKind::Deduction);
        let earnings_label = EARNINGS_LEFT + CELL_PAD;
        let earnings_amount = EARNINGS_RIGHT - CELL_PAD;
        let deductions_label = DEDUCTIONS_LEFT + CELL_PAD;
        let deductions_amount = DEDUCTIONS_RIGHT - CELL_PAD;

        let y = top - ROW_HEIGHT;
        canvas.cell("label", "EARNINGS", earnings_label, y, Font::Bold)?;
        canvas.cell_right("label", "HOURS", EARNINGS_HOURS_RIGHT, y, Font::Bold)?;
        canvas.cell_right("label", "AMOUNT", earnings_amount, y, Font::Bold)?;
        canvas.cell("label", "DEDUCTIONS", deductions_label, y, Font::Bold)?;
        canvas.cell_right("label", "AMOUNT", deductions_amount, y, Font::Bold)?;

        let rule_y = y - 5.0;
        canvas.rule(EARNINGS_LEFT, EARNINGS_RIGHT, rule_y, 0.5);
        canvas.rule(DEDUCTIONS_LEFT, DEDUCTIONS_RIGHT, rule_y, 0.5);

        for (index, row) in earnings.iter().enumerate() {
            let y = rule_y - ROW_HEIGHT * (index as f32 + 1.0);
            canvas.cell("label", row.label, earnings_label, y, Font::Regular)?;
            if let Some(hours) = row.hours {
                let hours = format_hours(hours);
                canvas.cell_right("hours", &hours, EARNINGS_HOURS_RIGHT, y, Font::Regular)?;
            }
            let amount = format_amount(row.amount);
            canvas.cell_right("amount", &amount, earnings_amount, y, Font::Regular)?;
        }
        for (index, row) in deductions.iter().enumerate() {
            let y = rule_y - ROW_HEIGHT * (index as f32 + 1.0);
            canvas.cell("label", row.label, deductions_label, y, Font::Regular)?;
            let amount = format_amount(row.amount);
            canvas.cell_right("amount", &amount, deductions_amount, y, Font::Regular)?;
        }

        let body_rows = earnings.len().max(deductions.len()) as f32;
        let totals_rule = rule_y - ROW_HEIGHT * body_rows - 6.0;
        canvas.rule(EARNINGS_LEFT, EARNINGS_RIGHT, totals_rule, 0.5);
        canvas.rule(DEDUCTIONS_LEFT, DEDUCTIONS_RIGHT, totals_rule, 0.5);

        let y = totals_rule - ROW_HEIGHT;
        let gross = format_amount(record.gross_income);
        let deducted = format_amount(record.total_deductions);
        canvas.cell("label", "Gross Income", earnings_label, y, Font::Bold)?;
        canvas.cell_right("gross_income", &gross, earnings_amount, y, Font::Bold)?;
        canvas.cell("label", "Total Deductions", deductions_label, y, Font::Bold)?;
        canvas.cell_right("total_deductions", &deducted, deductions_amount, y, Font::Bold)?;

        let y = y - ROW_HEIGHT - 4.0;
        fits("line_items", y - 5.0)?;
        let net = format_amount(record.net_pay);
        canvas.text("label", "NET PAY", deductions_label, y, Font::Bold, 11.0)?;
        canvas.text_right("net_pay", &net, deductions_amount, y, Font::Bold, 11.0)?;
        canvas.rule(DEDUCTIONS_LEFT, DEDUCTIONS_RIGHT, y - 5.0, 0.75);

        Ok(y - 20.0)
    }

    fn footer_text(&self, canvas: &mut Canvas, top: f32) -> Result<(), RenderError> {
        let lines = wrap(&self.profile.footer_text, FOOTER_WRAP);
        if let Some(last) = lines.len().checked_sub(1) {
            fits("footer_text", top - FOOTER_LEADING * last as f32)?;
        }
        for (index, line) in lines.iter().enumerate() {
            let y = top - FOOTER_LEADING * index as f32;
            canvas.text("footer_text", line, MARGIN, y, Font::Regular, SMALL_SIZE)?;
        }
        Ok(())
    }

    fn acknowledgement(&self, canvas: &mut Canvas) -> Result<(), RenderError> {
        let left = DEDUCTIONS_LEFT + 124.0;
        let right = DEDUCTIONS_RIGHT;
        let center = (left + right) / 2.0;

        let name = &self.record.name;
        let caption = "Signature over Printed Name / Date";

        canvas.cell("label", "Received by:", left, 112.0, Font::Regular)?;
        canvas.text_center("name", name, center, 80.0, Font::Bold, BODY_SIZE)?;
        canvas.rule(left, right, 76.0, 0.5);
        canvas.text_center("label", caption, center, 64.0, Font::Regular, SMALL_SIZE)?;
        Ok(())
    }

    fn page_foot(&self, canvas: &mut Canvas) -> Result<(), RenderError> {
        let right = PAGE_WIDTH - MARGIN;
        if let Some(date) = &self.profile.effectivity_date {
            let label = format!("Effectivity Date: {date}");
            canvas.text("effectivity_date", &label, MARGIN, 24.0, Font::Regular, SMALL_SIZE)?;
        }
        if let Some(id) = &self.profile.document_id {
            canvas.text_right("document_id", id, right, 24.0, Font::Regular, SMALL_SIZE)?;
        }
        Ok(())
    }
}

fn fits(section: &str, lowest: f32) -> Result<(), RenderError> {
    if lowest < CONTENT_FLOOR {
        return Err(RenderError::LayoutOverflow {
            section: section.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LineAmount, MailCredentials};
    use std::collections::BTreeMap;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn create_test_record() -> EmployeeRecord {
        EmployeeRecord {
            employee_id: "E1".to_string(),
            name: "Jane Doe".to_string(),
            email: "jane@x.com".to_string(),
            pay_period: "Jan 1-15, 2025".to_string(),
            position: None,
            basic_salary: None,
            monthly_allowance: None,
            gross_income: dec("12500"),
            total_deductions: dec("1250.5"),
            net_pay: dec("11249.5"),
            line_items: BTreeMap::new(),
        }
    }

    fn create_test_profile() -> CompanyProfile {
        CompanyProfile {
            name: "Acme Corp".to_string(),
            footer_text: "Confidential.".to_string(),
            document_id: Some("HR-012".to_string()),
            effectivity_date: Some("Jan 1, 2025".to_string()),
            logo: None,
            mail: MailCredentials::new("hr@acme.test", "x", "smtp.acme.test", 587),
        }
    }

    fn compose(record: &EmployeeRecord, pinned: &[LineItem]) -> Vec<String> {
        let profile = create_test_profile();
        let layout = PayslipLayout {
            record,
            profile: &profile,
            pinned,
            logo: None,
        };
        layout.compose().unwrap().texts().to_vec()
    }

    #[test]
    fn test_required_only_record_has_identity_and_totals_without_items() {
        let texts = compose(&create_test_record(), &[]);

        let expected = [
            "Acme Corp",
            "E1",
            "Jane Doe",
            "Jan 1-15, 2025",
            "12,500.00",
            "1,250.50",
            "11,249.50",
        ];
        for expected in expected {
            assert!(texts.iter().any(|t| t == expected), "missing {expected}");
        }
        for item in LineItem::ALL {
            assert!(!texts.iter().any(|t| t == item.label()), "unexpected {:?}", item);
        }
        assert!(!texts.iter().any(|t| t == "Department/Position:"));
    }

    #[test]
    fn test_zero_items_hidden_unless_pinned() {
        let mut record = create_test_record();
        record.line_items.insert(LineItem::Allowance, LineAmount::default());
        record.line_items.insert(
            LineItem::WithholdingTax,
            LineAmount {
                amount: dec("300"),
                hours: None,
            },
        );

        let texts = compose(&record, &[]);
        assert!(!texts.iter().any(|t| t == "Allowance"));
        assert!(texts.iter().any(|t| t == "Withholding Tax"));

        let texts = compose(&record, &[LineItem::Allowance, LineItem::SssLoan]);
        assert!(texts.iter().any(|t| t == "Allowance"));
        assert!(texts.iter().any(|t| t == "SSS Loan"));
    }

    #[test]
    fn test_hours_printed_for_time_based_items() {
        let mut record = create_test_record();
        record.line_items.insert(
            LineItem::RegularPay,
            LineAmount {
                amount: dec("10000"),
                hours: Some(dec("88.00")),
            },
        );
        let texts = compose(&record, &[]);
        assert!(texts.iter().any(|t| t == "Regular Hours"));
        assert!(texts.iter().any(|t| t == "88"));
        assert!(texts.iter().any(|t| t == "10,000.00"));
    }

    #[test]
    fn test_document_chrome_is_printed() {
        let mut record = create_test_record();
        record.position = Some("Engineering".to_string());
        let texts = compose(&record, &[]);
        assert!(texts.iter().any(|t| t == "Engineering"));
        assert!(texts.iter().any(|t| t == "Confidential."));
        assert!(texts.iter().any(|t| t == "Received by:"));
        assert!(texts.iter().any(|t| t == "Effectivity Date: Jan 1, 2025"));
        assert!(texts.iter().any(|t| t == "HR-012"));
    }

    #[test]
    fn test_unsupported_character_names_field() {
        let mut record = create_test_record();
        record.name = "山田".to_string();
        let profile = create_test_profile();
        let layout = PayslipLayout {
            record: &record,
            profile: &profile,
            pinned: &[],
            logo: None,
        };
        match layout.compose() {
            Err(RenderError::UnsupportedCharacter { field, character }) => {
                assert_eq!(field, "name");
                assert_eq!(character, '山');
            }
            other => panic!("Expected UnsupportedCharacter, got {:?}", other.map(|_| ())),
        }
    }

    fn overflow_section(record: &EmployeeRecord, profile: &CompanyProfile) -> Option<String> {
        let layout = PayslipLayout {
            record,
            profile,
            pinned: &LineItem::ALL,
            logo: None,
        };
        match layout.compose() {
            Err(RenderError::LayoutOverflow { section }) => Some(section),
            Err(other) => panic!("Expected LayoutOverflow, got {other:?}"),
            Ok(_) => None,
        }
    }

    #[test]
    fn test_long_footer_is_layout_overflow() {
        let mut profile = create_test_profile();
        profile.footer_text = "Confidential notice line.\n".repeat(60);

        let section = overflow_section(&create_test_record(), &profile);
        assert_eq!(section.as_deref(), Some("footer_text"));
    }

    #[test]
    fn test_every_line_item_stays_above_acknowledgement() {
        let mut record = create_test_record();
        record.position = Some("Engineering".to_string());
        record.basic_salary = Some(dec("25000"));
        record.monthly_allowance = Some(dec("2000"));
        let mut profile = create_test_profile();
        profile.footer_text = "This payslip is confidential. ".repeat(6);
        assert_eq!(overflow_section(&record, &profile), None);

        let layout = PayslipLayout {
            record: &record,
            profile: &profile,
            pinned: &LineItem::ALL,
            logo: None,
        };
        let texts = layout.compose().unwrap().texts().to_vec();
        for item in LineItem::ALL {
            assert!(texts.iter().any(|t| t == item.label()), "missing {:?}", item);
        }
    }

    #[test]
    fn test_content_below_floor_is_rejected() {
        assert!(fits("line_items", CONTENT_FLOOR).is_ok());
        match fits("line_items", CONTENT_FLOOR - 1.0) {
            Err(RenderError::LayoutOverflow { section }) => assert_eq!(section, "line_items"),
            other => panic!("Expected LayoutOverflow, got {other:?}"),
        }
    }
}
