//! Header patterns of the Somex PDF layout. Alternatives are tried in
//! order and the first match wins.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

use crate::ubl::SOMEX_SELLER_NIT;

#[derive(Clone, Copy)]
enum DateOrder {
    /// One capture holding `YYYY-MM-DD`.
    Iso,
    /// Three captures: day, month, year.
    DayMonthYear,
}

lazy_static! {
    static ref INVOICE_NUMBER: Vec<Regex> = compile(&[
        r"(?i)FACTURA\s+ELECTR[OÓ]NICA\s+DE\s+VENTA\s+No\.?\s*[:.]?\s*([A-Z0-9\-]+)",
        r"(?i)No\.?\s*Factura\s*[:.]?\s*([A-Z0-9\-]+)",
        r"(?i)N[°º]\s*Factura\s*[:.]?\s*([A-Z0-9\-]+)",
    ]);
    static ref INVOICE_DATE: Vec<(Regex, DateOrder)> = compile_dates(&[
        (r"(?i)Fecha\s+(?:de\s+)?Factura\s*[:.]?\s*(\d{4}-\d{2}-\d{2})", DateOrder::Iso),
        (r"(?i)Fecha\s+(?:de\s+)?Factura\s*[:.]?\s*(\d{2})/(\d{2})/(\d{4})", DateOrder::DayMonthYear),
        (r"(?i)Fecha\s+(?:de\s+)?Factura\s*[:.]?\s*(\d{2})-(\d{2})-(\d{4})", DateOrder::DayMonthYear),
    ]);
    static ref DUE_DATE: Vec<(Regex, DateOrder)> = compile_dates(&[
        (r"(?i)Fecha\s+(?:de\s+)?Vencimiento\s*[:.]?\s*(\d{4}-\d{2}-\d{2})", DateOrder::Iso),
        (r"(?i)Fecha\s+(?:de\s+)?Vencimiento\s*[:.]?\s*(\d{2})/(\d{2})/(\d{4})", DateOrder::DayMonthYear),
        (r"(?i)Fecha\s+(?:de\s+)?Vencimiento\s*[:.]?\s*(\d{2})-(\d{2})-(\d{4})", DateOrder::DayMonthYear),
        (r"(?i)Vencimiento\s*[:.]?\s*(\d{4}-\d{2}-\d{2})", DateOrder::Iso),
    ]);
    static ref BUYER_NIT: Regex = Regex::new(r"(?i)\bNit\s*[:.]?\s*(\d+)").expect("valid NIT pattern");
    static ref BUYER_NAME: Vec<Regex> = compile(&[
        r"(?i)Cliente\s*[:.]?\s*([A-ZÀ-Ÿ][A-ZÀ-Ÿ\s\.]+?)(?:\s+Nit|\s+Ciudad|$)",
        r"(?i)Nombre\s+(?:del\s+)?Cliente\s*[:.]?\s*([A-ZÀ-Ÿ][A-ZÀ-Ÿ\s\.]+?)(?:\s+Nit|\s+Ciudad|$)",
    ]);
    static ref MUNICIPALITY: Vec<Regex> = compile(&[
        r"(?i)Ciudad-Dpto\s*[:.]?\s*([A-ZÀ-Ÿ][A-ZÀ-Ÿ\s\-]+?)(?:\s+Tel|\s+Direcci[oó]n|\s+Fecha|$)",
        r"(?i)Ciudad\s*[:.]?\s*([A-ZÀ-Ÿ][A-ZÀ-Ÿ\s\-]+?)(?:\s+Tel|\s+Direcci[oó]n|\s+Fecha|$)",
        r"(?i)Municipio\s*[:.]?\s*([A-ZÀ-Ÿ][A-ZÀ-Ÿ\s\-]+?)(?:\s+Tel|\s+Direcci[oó]n|\s+Fecha|$)",
    ]);
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("valid header pattern"))
        .collect()
}

fn compile_dates(patterns: &[(&str, DateOrder)]) -> Vec<(Regex, DateOrder)> {
    patterns
        .iter()
        .map(|(p, order)| (Regex::new(p).expect("valid date pattern"), *order))
        .collect()
}

fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    patterns.iter().find_map(|re| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|v| !v.is_empty())
    })
}

fn first_date(patterns: &[(Regex, DateOrder)], text: &str) -> Option<NaiveDate> {
    patterns.iter().find_map(|(re, order)| {
        let caps = re.captures(text)?;
        match order {
            DateOrder::Iso => NaiveDate::parse_from_str(caps.get(1)?.as_str(), "%Y-%m-%d").ok(),
            DateOrder::DayMonthYear => {
                let day = caps.get(1)?.as_str().parse().ok()?;
                let month = caps.get(2)?.as_str().parse().ok()?;
                let year = caps.get(3)?.as_str().parse().ok()?;
                NaiveDate::from_ymd_opt(year, month, day)
            }
        }
    })
}

/// Invoice number (e.g. `2B-286000`).
pub fn invoice_number(text: &str) -> Option<String> {
    first_capture(&INVOICE_NUMBER, text)
}

pub fn invoice_date(text: &str) -> Option<NaiveDate> {
    first_date(&INVOICE_DATE, text)
}

pub fn due_date(text: &str) -> Option<NaiveDate> {
    first_date(&DUE_DATE, text)
}

/// First NIT in the text that is not Somex's own.
pub fn buyer_nit(text: &str) -> Option<String> {
    BUYER_NIT
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .find(|nit| nit != SOMEX_SELLER_NIT)
}

pub fn buyer_name(text: &str) -> Option<String> {
    first_capture(&BUYER_NAME, text)
}

pub fn municipality(text: &str) -> Option<String> {
    first_capture(&MUNICIPALITY, text)
}
