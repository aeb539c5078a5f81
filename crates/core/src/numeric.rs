use rust_decimal::Decimal;
use std::str::FromStr;

/// Localized number layout of one bank's documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericFormat {
    pub thousands_separator: String,
    pub decimal_separator: String,
}

impl Default for NumericFormat {
    fn default() -> Self {
        Self {
            thousands_separator: ",".to_string(),
            decimal_separator: ".".to_string(),
        }
    }
}

/// Parse a localized decimal. Parentheses around the number negate it
/// (accounting notation); embedded whitespace and currency symbols are
/// ignored. Blank or non-numeric input yields `None`, never zero.
pub fn parse_decimal(raw: &str, format: &NumericFormat) -> Option<Decimal> {
    let text = raw.replace('\u{a0}', " ");
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let negated = text.contains('(') && text.contains(')');

    let mut text = text.to_string();
    if !format.thousands_separator.is_empty() {
        text = text.replace(&format.thousands_separator, "");
    }
    if format.decimal_separator != "." {
        text = text.replace(&format.decimal_separator, ".");
    }

    // Keep digits, dots, and a single leading minus.
    let mut cleaned = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '0'..='9' | '.' => cleaned.push(c),
            '-' if cleaned.is_empty() => cleaned.push(c),
            _ => {}
        }
    }
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }

    let value = Decimal::from_str(&cleaned).ok()?;
    Some(if negated { -value } else { value })
}
