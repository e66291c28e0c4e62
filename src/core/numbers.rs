//! Locale-ambiguous number handling.
//!
//! Somex PDFs print amounts either as `9.778.875,00` or `9,778,875.00`, and
//! product names carry the bundle weight (`... X 40 KILOS`). Every derived
//! quantity and unit price goes through this module.

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

use super::error::IngestError;

lazy_static! {
    static ref KILOS_IN_NAME: Regex =
        Regex::new(r"(?i)\bX\s*(\d+(?:\.\d+)?)\s*KILO").expect("valid kilos pattern");
}

/// Parse a number written with either `.` or `,` as decimal separator.
///
/// - currency symbol and whitespace are stripped;
/// - a single separator followed by at most two digits is the decimal separator,
///   otherwise every occurrence is a thousands separator;
/// - with both separators present, the one occurring last is the decimal
///   separator.
///
/// An empty input reads as zero.
pub fn parse_colombian_number(input: &str) -> Result<Decimal, IngestError> {
    let cleaned: String = input
        .chars()
        .filter(|c| *c != '$' && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return Ok(Decimal::ZERO);
    }

    let last_dot = cleaned.rfind('.');
    let last_comma = cleaned.rfind(',');

    let normalized = match (last_dot, last_comma) {
        (None, None) => cleaned,
        (None, Some(_)) => single_separator(&cleaned, ','),
        (Some(_), None) => single_separator(&cleaned, '.'),
        (Some(dot), Some(comma)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
    };

    Decimal::from_str(&normalized)
        .map_err(|e| IngestError::NumericParse(format!("invalid number '{input}': {e}")))
}

fn single_separator(value: &str, sep: char) -> String {
    let mut groups = value.split(sep);
    let _ = groups.next();
    let is_decimal = match (groups.next(), groups.next()) {
        (Some(tail), None) => tail.len() <= 2,
        _ => false,
    };
    if is_decimal {
        value.replace(sep, ".")
    } else {
        value.replace(sep, "")
    }
}

/// Parse a canonical XML decimal (`40.000000`), falling back to the
/// locale heuristic for hand-edited documents.
pub fn parse_xml_decimal(input: &str) -> Result<Decimal, IngestError> {
    let trimmed = input.trim();
    Decimal::from_str(trimmed).or_else(|_| parse_colombian_number(trimmed))
}

/// Extract the kilos per bundle from a product name (`"... X 40 KILOS"` → 40).
pub fn kilos_in_name(product_name: &str) -> Option<Decimal> {
    let caps = KILOS_IN_NAME.captures(product_name)?;
    Decimal::from_str(caps.get(1)?.as_str()).ok()
}

/// `total ÷ quantity`, or `None` when the quantity is zero or negative.
pub fn derive_unit_price(total: Decimal, quantity: Decimal) -> Option<Decimal> {
    if quantity <= Decimal::ZERO {
        return None;
    }
    total.checked_div(quantity).map(|price| price.normalize())
}
