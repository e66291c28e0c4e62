//! DIAN UBL 2.1 ingestion: document classification and the XML dialects.
//!
//! # Supported inputs
//!
//! - **Bare invoices**: a UBL `Invoice` document.
//! - **`AttachedDocument` envelopes**: the invoice travels as escaped or
//!   CDATA-wrapped XML inside `Attachment/ExternalReference/Description`.
//! - **PDF** payloads are recognized here and parsed by the `pdf` feature.
//!
//! # Example
//!
//! ```no_run
//! use facturacol::core::*;
//! use facturacol::ubl::{self, ClassifiedDocument};
//!
//! let bytes = std::fs::read("factura.xml").unwrap();
//! let inventory = Inventory::new();
//! let ctx = ParseContext::new(&inventory, DEFAULT_SUBYACENTE_CODE);
//! if let ClassifiedDocument::BareInvoice(xml) = ubl::classify(&bytes, false).unwrap() {
//!     let invoice = ubl::parse_standard(&xml, &ctx).unwrap();
//!     println!("{} with {} items", invoice.invoice_number, invoice.items.len());
//! }
//! ```

mod classify;
mod scan;
mod somex;
mod standard;
pub(crate) mod xml_utils;

pub use classify::{ClassifiedDocument, classify, unwrap_attached_document};
pub use somex::{SOMEX_SELLER_NAME, SOMEX_SELLER_NIT, parse_somex};
pub use standard::parse_standard;

use rust_decimal::Decimal;

use crate::core::numbers::parse_xml_decimal;
use crate::core::{Invoice, ParseWarning, WarningKind, derive_unit_price};

/// UBL 2.1 namespace URIs.
pub mod ubl_ns {
    pub const INVOICE: &str = "urn:oasis:names:specification:ubl:schema:xsd:Invoice-2";
    pub const ATTACHED_DOCUMENT: &str =
        "urn:oasis:names:specification:ubl:schema:xsd:AttachedDocument-2";
    pub const CAC: &str =
        "urn:oasis:names:specification:ubl:schema:xsd:CommonAggregateComponents-2";
    pub const CBC: &str = "urn:oasis:names:specification:ubl:schema:xsd:CommonBasicComponents-2";
}

/// Read an amount from a line field; unparsable values become zero and
/// are flagged on the invoice.
pub(crate) fn line_amount(
    value: Option<&str>,
    field: &str,
    line: usize,
    invoice: &mut Invoice,
) -> Decimal {
    let Some(raw) = value else {
        return Decimal::ZERO;
    };
    match parse_xml_decimal(raw) {
        Ok(v) => v,
        Err(e) => {
            invoice.warn(ParseWarning::at_line(
                line,
                WarningKind::NumericParse,
                format!("{field}: {e}"),
            ));
            Decimal::ZERO
        }
    }
}

/// `total ÷ quantity`; a non-positive quantity yields zero and a warning.
pub(crate) fn flagged_unit_price(
    total: Decimal,
    quantity: Decimal,
    line: usize,
    invoice: &mut Invoice,
) -> Decimal {
    derive_unit_price(total, quantity).unwrap_or_else(|| {
        invoice.warn(ParseWarning::at_line(
            line,
            WarningKind::NonPositiveQuantity,
            format!("cannot derive unit price from {total} / {quantity}; using 0"),
        ));
        Decimal::ZERO
    })
}
