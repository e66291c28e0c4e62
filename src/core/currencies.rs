//! `DocumentCurrencyCode` to export currency mapping.
//!
//! The export layout knows three currencies; anything else (or a missing
//! code) is reported as pesos.

use super::types::Currency;

/// Map an ISO 4217 code to the export currency, defaulting to COP.
pub fn currency_from_iso(code: Option<&str>) -> Currency {
    let Some(code) = code else {
        return Currency::Cop;
    };
    let upper = code.trim().to_ascii_uppercase();
    match CURRENCY_CODES.binary_search_by(|(iso, _)| (*iso).cmp(upper.as_str())) {
        Ok(idx) => CURRENCY_CODES[idx].1,
        Err(_) => Currency::Cop,
    }
}

/// Whether `code` is one of the currencies the export layout distinguishes.
pub fn is_known_currency_code(code: &str) -> bool {
    CURRENCY_CODES
        .binary_search_by(|(iso, _)| (*iso).cmp(code))
        .is_ok()
}

/// Sorted for binary search.
static CURRENCY_CODES: &[(&str, Currency)] = &[
    ("COP", Currency::Cop),
    ("EUR", Currency::Eur),
    ("USD", Currency::Usd),
];
