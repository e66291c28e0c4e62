//! Batch ingestion: strategy dispatch, idempotent processing, archives.
//!
//! # Example
//!
//! ```no_run
//! use facturacol::core::*;
//! use facturacol::engine::{Engine, SourceDocument};
//!
//! let client = ClientConfig::new("somex", Dialect::Somex);
//! let engine = Engine::new(client, Inventory::new(), MemoryLedger::new());
//! let bytes = std::fs::read("factura.xml").unwrap();
//! let report = engine.process_batch(vec![SourceDocument::new("factura.xml", bytes)]);
//! println!("{} processed, {} skipped", report.processed(), report.skipped());
//! ```

#[cfg(feature = "archive")]
mod archive;
mod batch;
mod strategy;

#[cfg(feature = "archive")]
pub use archive::extract_documents;
pub use batch::{BatchReport, DocumentOutcome, DocumentStatus, Engine, SourceDocument};
pub use strategy::{ParserStrategy, StrategySet};
