use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::extract::{PdfContent, extract_pages};
use super::patterns;
use super::tables::ColumnMap;
use crate::core::{
    Currency, IngestError, Invoice, InvoiceItem, ParseContext, ParseWarning, WarningKind,
    parse_colombian_number,
};
use crate::ubl::{SOMEX_SELLER_NAME, SOMEX_SELLER_NIT, flagged_unit_price};

/// Load a Somex PDF invoice and parse it.
pub fn parse_somex_pdf_bytes(bytes: &[u8], ctx: &ParseContext<'_>) -> Result<Invoice, IngestError> {
    let content = extract_pages(bytes)?;
    parse_somex_pdf(&content, ctx)
}

/// Parse a Somex invoice from extracted PDF content.
///
/// The header is read from the text of all pages; items come from the
/// product table of the first page. Without such a table the header is
/// still returned, flagged [`WarningKind::TableNotFound`].
pub fn parse_somex_pdf(content: &PdfContent, ctx: &ParseContext<'_>) -> Result<Invoice, IngestError> {
    let text = content.full_text();

    let invoice_number = patterns::invoice_number(&text)
        .ok_or_else(|| IngestError::Parse("invoice number not found in PDF".into()))?;
    let invoice_date = patterns::invoice_date(&text)
        .ok_or_else(|| IngestError::Parse("invoice date not found in PDF".into()))?;

    let mut invoice = Invoice {
        invoice_number,
        invoice_date,
        payment_date: patterns::due_date(&text),
        seller_nit: SOMEX_SELLER_NIT.to_string(),
        seller_name: SOMEX_SELLER_NAME.to_string(),
        buyer_nit: header_field(patterns::buyer_nit(&text), "buyer NIT"),
        buyer_name: header_field(patterns::buyer_name(&text), "buyer name"),
        municipality: header_field(patterns::municipality(&text), "municipality"),
        currency: Currency::Cop,
        description: None,
        items: Vec::new(),
        warnings: Vec::new(),
    };
    info!(
        invoice = %invoice.invoice_number,
        date = %invoice.invoice_date,
        buyer = %invoice.buyer_nit,
        "PDF header extracted"
    );

    let table = match content.product_table() {
        Ok(table) => table,
        Err(e) => {
            invoice.warn(ParseWarning::new(WarningKind::TableNotFound, e.to_string()));
            return Ok(invoice);
        }
    };

    let columns = ColumnMap::from_header(&table[0]);
    debug!(?columns, "product table columns");

    for (row_idx, row) in table.iter().enumerate().skip(1) {
        if row.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        if let Some(item) = parse_row(row, row_idx, &columns, ctx, &mut invoice) {
            invoice.items.push(item);
        }
    }

    if invoice.items.is_empty() {
        invoice.warn(ParseWarning::new(WarningKind::NoItems, "product table has no items"));
    }
    Ok(invoice)
}

fn header_field(value: Option<String>, field: &str) -> String {
    value.unwrap_or_else(|| {
        warn!("{field} not found in PDF");
        String::new()
    })
}

fn parse_row(
    row: &[String],
    row_idx: usize,
    columns: &ColumnMap,
    ctx: &ParseContext<'_>,
    invoice: &mut Invoice,
) -> Option<InvoiceItem> {
    let needed = [
        columns.reference_idx(),
        columns.description_idx(),
        columns.bundles_idx(),
        columns.kilos_idx(),
        columns.line_total_idx(),
        columns.tax_percent_idx(),
    ];
    if let Some(&missing) = needed.iter().find(|&&i| i >= row.len()) {
        invoice.warn(ParseWarning::new(
            WarningKind::MalformedRow,
            format!(
                "table row {row_idx} has {} cells, column {missing} is missing; skipped",
                row.len()
            ),
        ));
        return None;
    }

    let product_code = row[columns.reference_idx()].trim();
    if product_code.is_empty() {
        return None;
    }
    let line = invoice.items.len();

    let mut number = |cell: &str, field: &str| -> Decimal {
        let cell = cell.trim();
        let cell = if cell.is_empty() { "0" } else { cell };
        parse_colombian_number(cell).unwrap_or_else(|e| {
            invoice.warn(ParseWarning::at_line(
                line,
                WarningKind::NumericParse,
                format!("{field}: {e}"),
            ));
            Decimal::ZERO
        })
    };

    let bundles = number(&row[columns.bundles_idx()], "bultos");
    let kilos = number(&row[columns.kilos_idx()], "kilos");
    let line_total = number(&row[columns.line_total_idx()], "valor total");
    let tax_percentage = number(&row[columns.tax_percent_idx()].replace('%', ""), "iva %");
    let unit_price = flagged_unit_price(line_total, kilos, line, invoice);

    let mut item = InvoiceItem {
        product_name: row[columns.description_idx()].trim().to_string(),
        product_code: product_code.to_string(),
        subyacente_code: ctx.subyacente_code.to_string(),
        quantity: kilos,
        quantity_original: bundles,
        unit_of_measure: "KG".to_string(),
        unit_price,
        tax_percentage,
        weight: None,
    };
    ctx.inventory.enrich(&mut item, false);

    debug!(
        row = row_idx,
        code = %item.product_code,
        kilos = %item.quantity,
        price = %item.unit_price,
        "table row parsed"
    );
    Some(item)
}
