use tracing::debug;

use super::line_amount;
use super::scan::{RawLine, RawUbl, non_empty, scan_ubl};
use crate::core::numbers::parse_xml_decimal;
use crate::core::{
    IngestError, Invoice, InvoiceItem, ParseContext, ParseWarning, WarningKind, currency_from_iso,
    map_unit_code,
};

/// Parse a plain DIAN UBL 2.1 invoice.
///
/// Header fields come from the root `ID`/`IssueDate`/`DueDate`, the parties
/// from `AccountingSupplierParty`/`AccountingCustomerParty`. A missing
/// invoice number or issue date is a [`IngestError::Parse`]; an invoice
/// without lines is returned with a [`WarningKind::NoItems`] warning.
pub fn parse_standard(xml: &str, ctx: &ParseContext<'_>) -> Result<Invoice, IngestError> {
    let raw = scan_ubl(xml)?;
    build(&raw, ctx)
}

fn build(raw: &RawUbl, ctx: &ParseContext<'_>) -> Result<Invoice, IngestError> {
    let customer = &raw.customer;
    let municipality = customer
        .physical_city
        .as_deref()
        .or(raw.delivery_city.as_deref())
        .or(customer.city())
        .unwrap_or_default();

    let mut invoice = Invoice {
        invoice_number: raw.invoice_id()?,
        invoice_date: raw.invoice_date()?,
        payment_date: raw.payment_date(),
        seller_nit: raw.supplier.company_id.clone().unwrap_or_default(),
        seller_name: raw.supplier.display_name().unwrap_or_default().to_string(),
        buyer_nit: customer.company_id.clone().unwrap_or_default(),
        buyer_name: customer.display_name().unwrap_or_default().to_string(),
        municipality: municipality.to_string(),
        currency: currency_from_iso(raw.currency.as_deref()),
        description: raw.note.clone(),
        items: Vec::with_capacity(raw.lines.len()),
        warnings: Vec::new(),
    };
    debug!(
        invoice = %invoice.invoice_number,
        seller = %invoice.seller_nit,
        lines = raw.lines.len(),
        "standard UBL header extracted"
    );

    for line in &raw.lines {
        let item = build_item(line, ctx, &mut invoice);
        invoice.items.push(item);
    }
    if invoice.items.is_empty() {
        invoice.warn(ParseWarning::new(WarningKind::NoItems, "invoice has no lines"));
    }
    Ok(invoice)
}

fn build_item(line: &RawLine, ctx: &ParseContext<'_>, invoice: &mut Invoice) -> InvoiceItem {
    let index = invoice.items.len();
    let quantity = line_amount(line.quantity.as_deref(), "InvoicedQuantity", index, invoice);
    let unit_price = line_amount(line.price.as_deref(), "PriceAmount", index, invoice);
    let tax_percentage = line_amount(line.tax_percent(), "Percent", index, invoice);

    let mut item = InvoiceItem {
        product_name: non_empty(line.description.as_deref().or(line.name.as_deref()))
            .unwrap_or_default(),
        product_code: line
            .sellers_id
            .clone()
            .or_else(|| line.standard_id.clone())
            .unwrap_or_default(),
        subyacente_code: ctx.subyacente_code.to_string(),
        quantity,
        quantity_original: quantity,
        unit_of_measure: map_unit_code(line.unit_code.as_deref().unwrap_or("UN")),
        unit_price,
        tax_percentage,
        weight: None,
    };

    ctx.inventory.enrich(&mut item, true);
    if item.weight.is_none() {
        item.weight = explicit_weight(line);
    }
    item
}

/// `Weight`/`NetWeight` element, else an item property named like a weight.
pub(crate) fn explicit_weight(line: &RawLine) -> Option<rust_decimal::Decimal> {
    line.weight
        .as_deref()
        .or_else(|| line.property_containing(&["peso", "weight"]))
        .and_then(|w| parse_xml_decimal(w).ok())
}
