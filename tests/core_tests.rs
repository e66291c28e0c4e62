#![cfg(feature = "core")]

use chrono::NaiveDate;
use facturacol::core::*;
use rust_decimal_macros::dec;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn item(name: &str, quantity: rust_decimal::Decimal) -> InvoiceItem {
    InvoiceItem {
        product_name: name.into(),
        product_code: "P-1".into(),
        subyacente_code: DEFAULT_SUBYACENTE_CODE.into(),
        quantity,
        quantity_original: quantity,
        unit_of_measure: "UN".into(),
        unit_price: dec!(1500),
        tax_percentage: dec!(19),
        weight: None,
    }
}

fn invoice() -> Invoice {
    Invoice {
        invoice_number: "FE-501".into(),
        invoice_date: date(2024, 10, 1),
        payment_date: None,
        seller_nit: "900111222".into(),
        seller_name: "Distribuidora Andina".into(),
        buyer_nit: "71222333".into(),
        buyer_name: "Tienda El Cruce".into(),
        municipality: "Envigado".into(),
        currency: Currency::default(),
        description: None,
        items: vec![item("Arroz 500 g", dec!(12))],
        warnings: vec![],
    }
}

// --- Canonical model ---

#[test]
fn invoice_serializes_decimals_as_strings() {
    let json = serde_json::to_value(invoice()).unwrap();
    assert_eq!(json["items"][0]["unit_price"], "1500");
    assert_eq!(json["currency"], "Cop");
    assert_eq!(json["invoice_date"], "2024-10-01");

    let back: Invoice = serde_json::from_value(json).unwrap();
    assert_eq!(back, invoice());
}

#[test]
fn warnings_are_attached_and_queryable() {
    let mut inv = invoice();
    assert!(!inv.has_warning(WarningKind::KilosNotFound));
    inv.warn(ParseWarning::at_line(
        0,
        WarningKind::KilosNotFound,
        "no kilo marker",
    ));
    assert!(inv.has_warning(WarningKind::KilosNotFound));
    assert_eq!(inv.warnings[0].to_string(), "[KilosNotFound] line 1: no kilo marker");
    assert_eq!(
        ParseWarning::new(WarningKind::NoItems, "empty").to_string(),
        "[NoItems] empty"
    );
}

#[test]
fn item_totals_use_effective_quantity() {
    let mut scaled = item("SAL X 40 KILOS", dec!(3));
    scaled.quantity = dec!(120);
    scaled.unit_price = dec!(2500);
    assert!(scaled.is_scaled());
    assert_eq!(scaled.total_value(), dec!(300000));
    assert!(!item("Arroz", dec!(1)).is_scaled());

    let huge = item("Melaza granel", rust_decimal::Decimal::MAX);
    assert_eq!(huge.total_value(), rust_decimal::Decimal::MAX);
}

// --- Lookup tables ---

#[test]
fn unit_codes_map_to_export_codes() {
    assert_eq!(map_unit_code("94"), "KG");
    assert_eq!(map_unit_code("KGM"), "KG");
    assert_eq!(map_unit_code("kgm"), "KG");
    assert_eq!(map_unit_code("NIU"), "UN");
    assert_eq!(map_unit_code("C62"), "UN");
    assert_eq!(map_unit_code("LTR"), "LT");
    assert_eq!(map_unit_code(" BX "), "BX");
    assert!(units::is_known_unit_code("GRM"));
    assert!(units::is_known_unit_code("kgm"));
    assert!(!units::is_known_unit_code("BX"));
}

#[test]
fn currency_codes_default_to_pesos() {
    assert_eq!(currency_from_iso(Some("COP")).code(), 1);
    assert_eq!(currency_from_iso(Some("usd")).code(), 2);
    assert_eq!(currency_from_iso(Some(" EUR ")).code(), 3);
    assert_eq!(currency_from_iso(Some("GBP")), Currency::Cop);
    assert_eq!(currency_from_iso(None), Currency::Cop);
    assert_eq!(Currency::Usd.iso_code(), "USD");
    assert!(is_known_currency_code("EUR"));
}

// --- Catalog ---

#[test]
fn catalog_import_matches_headers_in_any_order() {
    let csv = "U/M,PESO,Descripcion,Codigo\n\
               KGM,\"1.000,5\", Concentrado Inicio ,CI-1\n\
               UN,,Bloque mineral,BM-2\n\
               KG,abc,Sal blanca,SB-3\n\
               KG,10,,SIN-NOMBRE\n";
    let mut catalog = Inventory::new();
    assert_eq!(catalog.import_csv(csv.as_bytes()).unwrap(), 3);

    let hit = catalog.lookup("CONCENTRADO INICIO").unwrap();
    assert_eq!(hit.code, "CI-1");
    assert_eq!(hit.weight, Some(dec!(1000.5)));
    assert_eq!(hit.unit_of_measure, "KGM");

    assert_eq!(catalog.lookup("bloque mineral").unwrap().weight, None);
    assert_eq!(catalog.lookup("sal blanca").unwrap().weight, None);
    assert_eq!(
        catalog.stats(),
        InventoryStats {
            total_items: 3,
            items_with_weight: 1,
            items_without_weight: 2,
        }
    );
}

#[test]
fn catalog_without_known_headers_uses_positions() {
    let csv = "code,name,kg,unit\nM-1,Melaza,25,KGM\n";
    let mut catalog = Inventory::new();
    catalog.import_csv(csv.as_bytes()).unwrap();
    let hit = catalog.lookup("melaza").unwrap();
    assert_eq!(hit.code, "M-1");
    assert_eq!(hit.weight, Some(dec!(25)));
}

#[test]
fn catalog_reimport_replaces_everything() {
    let mut catalog = Inventory::new();
    catalog
        .import_csv("Codigo,Descripcion,PESO,U/M\nA,Avena,1,KG\n".as_bytes())
        .unwrap();
    catalog
        .import_csv("Codigo,Descripcion,PESO,U/M\nB,Cebada,2,KG\n".as_bytes())
        .unwrap();
    assert_eq!(catalog.len(), 1);
    assert!(catalog.lookup("avena").is_none());
    assert!(catalog.lookup("cebada").is_some());
}

// --- Configuration ---

#[test]
fn client_builder_matches_json_defaults() {
    let built = ClientConfig::new("somex", Dialect::Somex)
        .accept_pdf(true)
        .subyacente_code("SMX-1");
    let parsed = AppConfig::from_json_str(
        r#"{"clients":[{"id":"somex","name":"somex","dialect":"somex","accept_pdf":true,"subyacente_code":"SMX-1"}]}"#,
    )
    .unwrap();
    assert_eq!(parsed.client("somex").unwrap(), &built);
    assert!(built.enabled);
}

#[test]
fn config_file_is_read_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app_config.json");
    std::fs::write(&path, r#"{"clients":[{"id":"a"}],"output_directory":"salida"}"#).unwrap();
    let config = AppConfig::from_path(&path).unwrap();
    assert_eq!(config.clients.len(), 1);
    assert_eq!(config.output_directory, Some("salida".into()));

    assert!(matches!(
        AppConfig::from_path(&dir.path().join("missing.json")),
        Err(IngestError::Io(_))
    ));
}

// --- Ledger ---

#[test]
fn concurrent_claims_have_one_winner() {
    let ledger = MemoryLedger::new();
    let content = b"<Invoice><ID>FE-1</ID></Invoice>";

    let wins: usize = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let ledger = &ledger;
                scope.spawn(move || {
                    let meta = DocumentMetadata {
                        source_filename: format!("copia-{n}.xml"),
                        derived_invoice_number: "FE-1".into(),
                        ..DocumentMetadata::default()
                    };
                    usize::from(ledger.mark_processed(content, meta).unwrap())
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });

    assert_eq!(wins, 1);
    assert_eq!(ledger.count().unwrap(), 1);
}

#[test]
fn single_byte_difference_is_a_new_document() {
    let ledger = MemoryLedger::new();
    assert!(ledger.mark_processed(b"<Invoice/>", DocumentMetadata::default()).unwrap());
    assert!(!ledger.is_processed(b"<Invoice/> ").unwrap());
    assert!(ledger.mark_processed(b"<Invoice/> ", DocumentMetadata::default()).unwrap());

    let stats = ledger.stats().unwrap();
    assert_eq!(stats.total_processed, 2);
    assert_eq!(
        stats.last_processed_at,
        ledger.records().unwrap().first().map(|r| r.processed_at)
    );
}
