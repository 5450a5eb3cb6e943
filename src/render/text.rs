//! Text encoding, measurement, and number formatting for the built-in font.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::RenderError;

/// Helvetica advance widths for ASCII 32..=126, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

/// Encodes `value` as WinAnsi bytes for the standard Type 1 fonts.
///
/// `field` names the value in the error when a character has no WinAnsi code.
pub(crate) fn encode(field: &str, value: &str) -> Result<Vec<u8>, RenderError> {
    value
        .chars()
        .map(|c| {
            win_ansi(c).ok_or_else(|| RenderError::UnsupportedCharacter {
                field: field.to_string(),
                character: c,
            })
        })
        .collect()
}

fn win_ansi(c: char) -> Option<u8> {
    let code = c as u32;
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(code as u8),
        _ => match c {
            '\t' => Some(b' '),
            '€' => Some(0x80),
            '‚' => Some(0x82),
            '„' => Some(0x84),
            '…' => Some(0x85),
            '‘' => Some(0x91),
            '’' => Some(0x92),
            '“' => Some(0x93),
            '”' => Some(0x94),
            '•' => Some(0x95),
            '–' => Some(0x96),
            '—' => Some(0x97),
            '™' => Some(0x99),
            _ => None,
        },
    }
}

/// Approximate rendered width of `value` at `size` points.
pub(crate) fn text_width(value: &str, size: f32) -> f32 {
    let units: u32 = value
        .chars()
        .map(|c| match c as u32 {
            code @ 0x20..=0x7E => u32::from(HELVETICA_WIDTHS[(code - 0x20) as usize]),
            _ => 556,
        })
        .sum();
    units as f32 * size / 1000.0
}

/// Formats a money amount with two decimals and thousands separators.
///
/// ```text
/// 1234.5   -> 1,234.50
/// 0        -> 0.00
/// ```
pub(crate) fn format_amount(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let plain = format!("{:.2}", rounded.abs());
    let (whole, fraction) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{fraction}")
}

/// Formats an hours figure, dropping trailing zeros.
pub(crate) fn format_hours(value: Decimal) -> String {
    value.round_dp(2).normalize().to_string()
}

/// Greedy word wrap at `width` characters. Words longer than a line are kept whole.
pub(crate) fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let used = line.chars().count();
            if used > 0 && used + 1 + word.chars().count() > width {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_encode_latin1_text() {
        assert_eq!(encode("name", "José Peña").unwrap(), b"Jos\xe9 Pe\xf1a".to_vec());
    }

    #[test]
    fn test_encode_maps_typographic_quotes() {
        assert_eq!(
            encode("footer", "‘ok’ – €").unwrap(),
            vec![0x91, b'o', b'k', 0x92, b' ', 0x96, b' ', 0x80]
        );
    }

    #[test]
    fn test_encode_rejects_characters_outside_win_ansi() {
        let error = encode("name", "Li 王").unwrap_err();
        assert_eq!(
            error,
            RenderError::UnsupportedCharacter {
                field: "name".to_string(),
                character: '王'
            }
        );
    }

    #[test]
    fn test_text_width_of_digits() {
        assert!((text_width("1,000.00", 10.0) - 38.92).abs() < 0.01);
        assert_eq!(text_width("", 10.0), 0.0);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(dec("0")), "0.00");
        assert_eq!(format_amount(dec("5.5")), "5.50");
        assert_eq!(format_amount(dec("999.999")), "1,000.00");
        assert_eq!(format_amount(dec("1234567.891")), "1,234,567.89");
        assert_eq!(format_amount(dec("100000")), "100,000.00");
        assert_eq!(format_amount(dec("-1500.005")), "-1,500.01");
    }

    #[test]
    fn test_format_hours() {
        assert_eq!(format_hours(dec("80.00")), "80");
        assert_eq!(format_hours(dec("7.50")), "7.5");
    }

    #[test]
    fn test_wrap_at_width() {
        let lines = wrap("aaa bbb ccc ddd", 7);
        assert_eq!(lines, vec!["aaa bbb", "ccc ddd"]);
    }

    #[test]
    fn test_wrap_keeps_paragraphs_and_long_words() {
        let lines = wrap("short\nsupercalifragilistic word", 10);
        assert_eq!(lines, vec!["short", "supercalifragilistic", "word"]);
    }
}
