use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::{ParseWarning, WarningKind};
use super::inventory::Inventory;

/// Canonical invoice record produced by every parser strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// Invoice number; never empty on a successful parse.
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    /// Payment due date.
    pub payment_date: Option<NaiveDate>,
    pub seller_nit: String,
    pub seller_name: String,
    pub buyer_nit: String,
    pub buyer_name: String,
    /// Buyer municipality (exact city name).
    pub municipality: String,
    pub currency: Currency,
    /// Free-text invoice description.
    pub description: Option<String>,
    /// Line items in document order.
    pub items: Vec<InvoiceItem>,
    /// Non-fatal problems found while parsing.
    pub warnings: Vec<ParseWarning>,
}

impl Invoice {
    /// Attach a warning; item-level warnings carry the item index.
    pub fn warn(&mut self, warning: ParseWarning) {
        tracing::warn!(invoice = %self.invoice_number, "{warning}");
        self.warnings.push(warning);
    }

    /// `true` if any warning of `kind` was recorded.
    pub fn has_warning(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }

    /// Header parsed but no items: surfaced as a valid-but-incomplete invoice.
    pub fn is_incomplete(&self) -> bool {
        self.items.is_empty()
    }
}

/// A single invoice line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub product_name: String,
    pub product_code: String,
    /// Client-assigned underlying reference code.
    pub subyacente_code: String,
    /// Effective quantity after client-specific scaling.
    pub quantity: Decimal,
    /// Quantity exactly as read from the source.
    pub quantity_original: Decimal,
    /// Canonical short unit code (KG, LT, UN, ...).
    pub unit_of_measure: String,
    pub unit_price: Decimal,
    pub tax_percentage: Decimal,
    pub weight: Option<Decimal>,
}

impl InvoiceItem {
    /// `quantity * unit_price`, saturating at the decimal bounds.
    pub fn total_value(&self) -> Decimal {
        self.quantity.saturating_mul(self.unit_price)
    }

    /// Whether `quantity` differs from the source quantity.
    pub fn is_scaled(&self) -> bool {
        self.quantity != self.quantity_original
    }
}

/// Export currency code: `1` = COP, `2` = USD, `3` = EUR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    Cop,
    Usd,
    Eur,
}

impl Currency {
    /// Numeric export code.
    pub fn code(&self) -> u8 {
        match self {
            Self::Cop => 1,
            Self::Usd => 2,
            Self::Eur => 3,
        }
    }

    /// ISO 4217 alphabetic code.
    pub fn iso_code(&self) -> &'static str {
        match self {
            Self::Cop => "COP",
            Self::Usd => "USD",
            Self::Eur => "EUR",
        }
    }
}

/// Ledger entry for one distinct document content.
///
/// Created exactly once per content hash and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedDocumentRecord {
    /// Hex SHA-256 of the raw document bytes.
    pub content_hash: String,
    pub source_filename: String,
    /// Enclosing container, e.g. the ZIP the document came from.
    pub container_filename: Option<String>,
    pub processed_at: DateTime<Utc>,
    pub derived_invoice_number: String,
    /// Reference to the export the invoice ended up in.
    pub output_reference: Option<String>,
}

/// Read-only inputs shared by every parser strategy during a run.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    pub inventory: &'a Inventory,
    /// Written to every line's `subyacente_code`.
    pub subyacente_code: &'a str,
}

impl<'a> ParseContext<'a> {
    pub fn new(inventory: &'a Inventory, subyacente_code: &'a str) -> Self {
        Self {
            inventory,
            subyacente_code,
        }
    }
}
