#![cfg(feature = "pdf")]

use chrono::NaiveDate;
use facturacol::core::*;
use facturacol::engine::{DocumentStatus, Engine, SourceDocument};
use facturacol::pdf::{self, ColumnMap, PdfContent, PdfPage};
use facturacol::ubl::{SOMEX_SELLER_NAME, SOMEX_SELLER_NIT};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

const FIRST_PAGE: &str = "PRODUCTORA DE INSUMOS AGROPECUARIOS SOMEX S.A.S  NIT: 800221724\n\
    No. Factura: 2B-300111\n\
    Fecha Factura: 15-04-2024\n\
    Cliente: INVERSIONES LA MONTAÑA Nit: 901222333\n\
    Ciudad: SAHAGUN Dirección: Calle 5 # 3-20\n\
    \n\
    Referencia\tDescripción\tCant.Bultos\tCant.Kilos\tValor Total\tIva%\n\
    SAL-40\tSAL SOMEX CEBA X 40 KILOS\t5\t200\t$ 500.000,00\t19 %\n\
    MEL-25\tMELAZA X 25 KILOS\t4\t100\t120,000.00\t5\n";

/// Continuation page: its header text counts, its tables do not.
const SECOND_PAGE: &str = "Fecha de Vencimiento: 15/05/2024\n\
    \n\
    Referencia\tDescripción\tCant.Bultos\tCant.Kilos\tValor Total\tIva%\n\
    FLT-1\tFLETE\t1\t1\t10.000\t0\n";

fn content() -> PdfContent {
    PdfContent {
        pages: vec![
            PdfPage::from_text(1, FIRST_PAGE.to_string()),
            PdfPage::from_text(2, SECOND_PAGE.to_string()),
        ],
    }
}

#[test]
fn somex_pdf_maps_to_canonical_model() {
    let inventory = Inventory::from_items([InventoryItem::new(
        "SAL SOMEX CEBA X 40 KILOS",
        "SAL-40",
        Some(dec!(40)),
        "BUL",
    )]);
    let ctx = ParseContext::new(&inventory, "SMX-1");
    let invoice = pdf::parse_somex_pdf(&content(), &ctx).unwrap();

    let expected = Invoice {
        invoice_number: "2B-300111".into(),
        invoice_date: date(2024, 4, 15),
        payment_date: Some(date(2024, 5, 15)),
        seller_nit: SOMEX_SELLER_NIT.into(),
        seller_name: SOMEX_SELLER_NAME.into(),
        buyer_nit: "901222333".into(),
        buyer_name: "INVERSIONES LA MONTAÑA".into(),
        municipality: "SAHAGUN".into(),
        currency: Currency::Cop,
        description: None,
        items: vec![
            InvoiceItem {
                product_name: "SAL SOMEX CEBA X 40 KILOS".into(),
                product_code: "SAL-40".into(),
                subyacente_code: "SMX-1".into(),
                quantity: dec!(200),
                quantity_original: dec!(5),
                unit_of_measure: "KG".into(),
                unit_price: dec!(2500),
                tax_percentage: dec!(19),
                weight: Some(dec!(40)),
            },
            InvoiceItem {
                product_name: "MELAZA X 25 KILOS".into(),
                product_code: "MEL-25".into(),
                subyacente_code: "SMX-1".into(),
                quantity: dec!(100),
                quantity_original: dec!(4),
                unit_of_measure: "KG".into(),
                unit_price: dec!(1200),
                tax_percentage: dec!(5),
                weight: None,
            },
        ],
        warnings: vec![],
    };
    assert_eq!(invoice, expected);
}

#[test]
fn columns_are_located_by_header_text() {
    let header: Vec<String> = content().pages[0].tables[0][0].clone();
    let columns = ColumnMap::from_header(&header);
    assert_eq!(columns.reference, Some(0));
    assert_eq!(columns.description, Some(1));
    assert_eq!(columns.bundles, Some(2));
    assert_eq!(columns.kilos, Some(3));
    assert_eq!(columns.line_total, Some(4));
    assert_eq!(columns.tax_percent, Some(5));
    assert_eq!(columns.unit_price, None);
}

#[test]
fn item_totals_follow_derived_prices() {
    let inventory = Inventory::new();
    let ctx = ParseContext::new(&inventory, DEFAULT_SUBYACENTE_CODE);
    let invoice = pdf::parse_somex_pdf(&content(), &ctx).unwrap();
    let total: rust_decimal::Decimal = invoice.items.iter().map(|i| i.total_value()).sum();
    assert_eq!(total, dec!(620000));
    assert!(invoice.items.iter().all(|i| i.is_scaled()));
}

#[test]
fn only_somex_clients_with_pdf_enabled_take_pdfs() {
    let not_really_a_pdf = b"%PDF-1.7\n% truncated upload".to_vec();

    let standard = Engine::new(
        ClientConfig::new("lacteos", Dialect::Standard).accept_pdf(true),
        Inventory::new(),
        MemoryLedger::new(),
    );
    assert!(matches!(
        standard.parse(&not_really_a_pdf),
        Err(IngestError::Classification(_))
    ));

    let somex = Engine::new(
        ClientConfig::new("somex", Dialect::Somex).accept_pdf(true),
        Inventory::new(),
        MemoryLedger::new(),
    );
    assert!(matches!(
        somex.parse(&not_really_a_pdf),
        Err(IngestError::Parse(_))
    ));

    let report = somex.process_batch(vec![SourceDocument::new(
        "factura.pdf",
        not_really_a_pdf,
    )]);
    assert!(matches!(report.outcomes[0].status, DocumentStatus::Failed(_)));
    assert_eq!(somex.ledger().count().unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Generated PDFs with positioned table cells
// ---------------------------------------------------------------------------

const COLUMNS: [i64; 9] = [20, 60, 130, 300, 360, 420, 500, 600, 690];

/// Text operations for one line, each cell in its own text object.
fn cells_as_text_objects(y: i64, cells: &[&str]) -> Vec<lopdf::content::Operation> {
    use lopdf::Object;
    use lopdf::content::Operation;

    cells
        .iter()
        .zip(COLUMNS)
        .flat_map(|(cell, x)| {
            [
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 8.into()]),
                Operation::new("Td", vec![x.into(), y.into()]),
                Operation::new("Tj", vec![Object::string_literal(*cell)]),
                Operation::new("ET", vec![]),
            ]
        })
        .collect()
}

/// One text object per line, cells reached with relative `Td` moves.
fn cells_in_one_text_object(y: i64, cells: &[&str]) -> Vec<lopdf::content::Operation> {
    use lopdf::Object;
    use lopdf::content::Operation;

    let mut ops = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 8.into()]),
    ];
    let mut previous = 0;
    for (cell, x) in cells.iter().zip(COLUMNS) {
        let dy = if previous == 0 { y } else { 0 };
        ops.push(Operation::new("Td", vec![(x - previous).into(), dy.into()]));
        ops.push(Operation::new("Tj", vec![Object::string_literal(*cell)]));
        previous = x;
    }
    ops.push(Operation::new("ET", vec![]));
    ops
}

fn somex_pdf() -> Vec<u8> {
    use lopdf::content::Content;
    use lopdf::{Document, Object, Stream, dictionary};

    let mut ops = Vec::new();
    ops.extend(cells_in_one_text_object(
        560,
        &["PRODUCTORA DE INSUMOS AGROPECUARIOS SOMEX S.A.S  NIT: 800221724"],
    ));
    ops.extend(cells_as_text_objects(545, &["No. Factura:", "", "2B-300222"]));
    ops.extend(cells_as_text_objects(530, &["Fecha Factura:", "", "15-04-2024"]));
    ops.extend(cells_as_text_objects(
        515,
        &["Cliente: INVERSIONES EL PORVENIR", "", "", "Nit: 901222333"],
    ));
    ops.extend(cells_as_text_objects(500, &["Ciudad: SAHAGUN", "", "", "Direccion: Calle 5"]));
    ops.extend(cells_as_text_objects(
        470,
        &[
            "Linea",
            "Referencia",
            "Descripcion",
            "Cant.Bultos",
            "Cant.Kilos",
            "Precio Unitario",
            "Valor Total",
            "Valor IVA",
            "Iva%",
        ],
    ));
    ops.extend(cells_in_one_text_object(
        455,
        &[
            "1",
            "SAL-40",
            "SAL SOMEX CEBA X 40 KILOS",
            "5",
            "200",
            "2.500,00",
            "500.000,00",
            "95.000,00",
            "19%",
        ],
    ));
    ops.extend(cells_in_one_text_object(
        440,
        &[
            "2",
            "MEL-25",
            "MELAZA X 25 KILOS",
            "4",
            "100",
            "1.200,00",
            "120.000,00",
            "6.000,00",
            "5%",
        ],
    ));
    ops.extend(cells_in_one_text_object(410, &["Total a pagar: 620.000,00"]));

    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => Object::Reference(font_id),
        },
    });
    let content = Content { operations: ops }.encode().expect("encode content");
    let content_id = doc.add_object(Stream::new(dictionary! {}, content));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => Object::Reference(pages_id),
        "MediaBox" => vec![0.into(), 0.into(), 842.into(), 595.into()],
        "Contents" => Object::Reference(content_id),
        "Resources" => Object::Reference(resources_id),
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![Object::Reference(page_id)],
        "Count" => 1,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut output = Vec::new();
    doc.save_to(&mut output).expect("save Somex PDF");
    output
}

#[test]
fn positioned_cells_rebuild_the_product_table() {
    let content = pdf::extract_pages(&somex_pdf()).unwrap();
    let table = content.product_table().unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table[0].len(), 9);
    assert_eq!(
        table[1],
        [
            "1",
            "SAL-40",
            "SAL SOMEX CEBA X 40 KILOS",
            "5",
            "200",
            "2.500,00",
            "500.000,00",
            "95.000,00",
            "19%",
        ]
    );
    assert!(content.full_text().contains("No. Factura:\t2B-300222\n"));
}

#[test]
fn generated_somex_pdf_parses_end_to_end() {
    let inventory = Inventory::new();
    let ctx = ParseContext::new(&inventory, "SMX-1");
    let invoice = pdf::parse_somex_pdf_bytes(&somex_pdf(), &ctx).unwrap();

    assert_eq!(invoice.invoice_number, "2B-300222");
    assert_eq!(invoice.invoice_date, date(2024, 4, 15));
    assert_eq!(invoice.buyer_nit, "901222333");
    assert_eq!(invoice.buyer_name, "INVERSIONES EL PORVENIR");
    assert_eq!(invoice.municipality, "SAHAGUN");
    assert!(invoice.warnings.is_empty(), "{:?}", invoice.warnings);

    let summary: Vec<_> = invoice
        .items
        .iter()
        .map(|i| {
            (
                i.product_code.as_str(),
                i.quantity_original,
                i.quantity,
                i.unit_price,
                i.tax_percentage,
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("SAL-40", dec!(5), dec!(200), dec!(2500), dec!(19)),
            ("MEL-25", dec!(4), dec!(100), dec!(1200), dec!(5)),
        ]
    );

    let engine = Engine::new(
        ClientConfig::new("somex", Dialect::Somex).accept_pdf(true),
        Inventory::new(),
        MemoryLedger::new(),
    );
    let report = engine.process_batch(vec![SourceDocument::new("2B-300222.pdf", somex_pdf())]);
    assert_eq!(report.processed(), 1);
    assert_eq!(report.invoices[0].items.len(), 2);
}
