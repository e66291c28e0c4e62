//! Somex UBL dialect.
//!
//! Somex numbers invoices by order reference, names the buyer in a
//! `ReceiverParty`, and invoices bundles ("bultos") whose kilo weight is
//! only printed in the product name. Quantities are rescaled to kilos and
//! the unit price is derived from the taxable amount.

use rust_decimal::Decimal;
use tracing::debug;

use super::{flagged_unit_price, line_amount};
use super::scan::{PartyFields, RawLine, RawUbl, non_empty, parse_date, scan_ubl};
use super::standard::explicit_weight;
use crate::core::{
    IngestError, Invoice, InvoiceItem, ParseContext, ParseWarning, WarningKind, currency_from_iso,
    kilos_in_name,
};

/// Somex's own NIT; Somex documents never need it read from the payload.
pub const SOMEX_SELLER_NIT: &str = "800221724";

pub const SOMEX_SELLER_NAME: &str = "PRODUCTORA DE INSUMOS AGROPECUARIOS SOMEX S.A.S";

/// Product code used when a line carries no item identification.
const FALLBACK_PRODUCT_CODE: &str = "SPN-1";

/// Parse a Somex invoice. `envelope` is the enclosing `AttachedDocument`, if
/// any; its `ReceiverParty` is used when the invoice itself has none.
pub fn parse_somex(
    xml: &str,
    envelope: Option<&str>,
    ctx: &ParseContext<'_>,
) -> Result<Invoice, IngestError> {
    let raw = scan_ubl(xml)?;
    let envelope_receiver = match envelope.map(scan_ubl) {
        Some(Ok(env)) => env.receiver,
        Some(Err(e)) => {
            debug!("ignoring unreadable envelope: {e}");
            PartyFields::default()
        }
        None => PartyFields::default(),
    };
    build(&raw, &envelope_receiver, ctx)
}

fn build(
    raw: &RawUbl,
    envelope_receiver: &PartyFields,
    ctx: &ParseContext<'_>,
) -> Result<Invoice, IngestError> {
    let invoice_number = match non_empty(raw.order_reference.as_deref()) {
        Some(order) => order,
        None => raw.invoice_id()?,
    };
    let payment_date = raw
        .payment_due_date
        .as_deref()
        .and_then(|d| parse_date(d).ok())
        .or_else(|| raw.payment_date());

    let (buyer_nit, buyer_name, municipality) = buyer(raw, envelope_receiver);

    let mut invoice = Invoice {
        invoice_number,
        invoice_date: raw.invoice_date()?,
        payment_date,
        seller_nit: SOMEX_SELLER_NIT.to_string(),
        seller_name: SOMEX_SELLER_NAME.to_string(),
        buyer_nit,
        buyer_name,
        municipality,
        currency: currency_from_iso(raw.currency.as_deref()),
        description: raw.note.clone(),
        items: Vec::with_capacity(raw.lines.len()),
        warnings: Vec::new(),
    };
    debug!(
        invoice = %invoice.invoice_number,
        buyer = %invoice.buyer_nit,
        lines = raw.lines.len(),
        "Somex UBL header extracted"
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

/// Buyer NIT, name and municipality: invoice `ReceiverParty`, then the
/// envelope's, then `AccountingCustomerParty`.
fn buyer(raw: &RawUbl, envelope_receiver: &PartyFields) -> (String, String, String) {
    let receiver = if !raw.receiver.is_empty() {
        Some(&raw.receiver)
    } else if !envelope_receiver.is_empty() {
        Some(envelope_receiver)
    } else {
        None
    };

    match receiver {
        Some(party) => (
            party.company_id.clone().unwrap_or_default(),
            party.registered_name().unwrap_or_default().to_string(),
            party
                .tax_city
                .as_deref()
                .or(party.city())
                .unwrap_or_default()
                .to_string(),
        ),
        None => {
            let customer = &raw.customer;
            (
                customer.company_id.clone().unwrap_or_default(),
                customer.display_name().unwrap_or_default().to_string(),
                customer
                    .physical_city
                    .as_deref()
                    .or(raw.delivery_city.as_deref())
                    .or(customer.city())
                    .unwrap_or_default()
                    .to_string(),
            )
        }
    }
}

fn build_item(line: &RawLine, ctx: &ParseContext<'_>, invoice: &mut Invoice) -> InvoiceItem {
    let index = invoice.items.len();
    let product_name = non_empty(line.note.as_deref())
        .or_else(|| non_empty(line.description.as_deref()))
        .or_else(|| non_empty(line.name.as_deref()))
        .unwrap_or_default();
    let product_code = line
        .standard_id
        .clone()
        .or_else(|| line.sellers_id.clone())
        .unwrap_or_else(|| FALLBACK_PRODUCT_CODE.to_string());

    let bundles = line_amount(line.quantity.as_deref(), "InvoicedQuantity", index, invoice);
    let quantity = match kilos_in_name(&product_name) {
        Some(kilos) => bundles.checked_mul(kilos).unwrap_or_else(|| {
            invoice.warn(ParseWarning::at_line(
                index,
                WarningKind::NumericParse,
                format!("InvoicedQuantity: {bundles} x {kilos} KG overflows; using 0"),
            ));
            Decimal::ZERO
        }),
        None => {
            invoice.warn(ParseWarning::at_line(
                index,
                WarningKind::KilosNotFound,
                format!("no kilo marker in '{product_name}'; quantity left unscaled"),
            ));
            bundles
        }
    };

    let taxable = line_amount(
        line.taxable_amount
            .as_deref()
            .or(line.line_extension.as_deref()),
        "TaxableAmount",
        index,
        invoice,
    );
    let unit_price = flagged_unit_price(taxable, quantity, index, invoice);
    let tax_percentage = line_amount(line.tax_percent(), "Percent", index, invoice);

    let mut item = InvoiceItem {
        product_name,
        product_code,
        subyacente_code: ctx.subyacente_code.to_string(),
        quantity,
        quantity_original: bundles,
        unit_of_measure: "KG".to_string(),
        unit_price,
        tax_percentage,
        weight: explicit_weight(line),
    };
    if item.weight.is_none() {
        ctx.inventory.enrich(&mut item, false);
    }
    item
}
