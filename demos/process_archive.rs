//! Process ZIP archives of invoices for one client.
//!
//! ```text
//! cargo run --example process_archive --features all -- \
//!     app_config.json somex [catalogo.csv] correo-1.zip correo-2.zip
//! ```

use std::path::Path;

use facturacol::core::*;
use facturacol::engine::{BatchReport, Engine};
use facturacol::sqlite::SqliteLedger;

fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 {
        eprintln!("usage: process_archive <app_config.json> <client_id> [catalog.csv] <archive.zip>...");
        std::process::exit(2);
    }

    let config = AppConfig::from_path(Path::new(&args[0])).expect("config should load");
    let client = config.client(&args[1]).expect("client should be configured").clone();

    let mut inventory = Inventory::new();
    let mut archive_paths = Vec::new();
    for arg in &args[2..] {
        if arg.to_lowercase().ends_with(".csv") {
            let file = std::fs::File::open(arg).expect("catalog should open");
            inventory.import_csv(file).expect("catalog should import");
            let stats = inventory.stats();
            println!(
                "Catalog: {} products ({} with weight)",
                stats.total_items, stats.items_with_weight
            );
        } else {
            archive_paths.push(arg.as_str());
        }
    }

    let archives: Vec<(&str, Vec<u8>)> = archive_paths
        .iter()
        .map(|path| (*path, std::fs::read(path).expect("archive should be readable")))
        .collect();

    let report = match &config.ledger_path {
        Some(path) => {
            let ledger = SqliteLedger::open(path).expect("ledger should open");
            run(Engine::new(client, inventory, ledger), &archives)
        }
        None => run(Engine::new(client, inventory, MemoryLedger::new()), &archives),
    };

    println!(
        "{} documents: {} processed, {} skipped, {} failed",
        report.total(),
        report.processed(),
        report.skipped(),
        report.failed()
    );
    for invoice in &report.invoices {
        println!(
            "  {} {} -> {} ({} items, {} warnings)",
            invoice.invoice_date,
            invoice.invoice_number,
            invoice.buyer_name,
            invoice.items.len(),
            invoice.warnings.len()
        );
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&report.outcomes).expect("outcomes serialize")
    );
}

fn run<L: DedupLedger>(engine: Engine<L>, archives: &[(&str, Vec<u8>)]) -> BatchReport {
    let report = engine.process_archives(
        archives
            .iter()
            .map(|(name, bytes)| (*name, bytes.as_slice())),
    );
    if let Ok(stats) = engine.ledger().stats() {
        println!("Ledger: {} documents recorded", stats.total_processed);
    }
    report
}
