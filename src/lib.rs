//! # facturacol
//!
//! Ingestion engine for Colombian (DIAN) electronic invoices: UBL 2.1
//! documents, `AttachedDocument` envelopes and Somex PDFs are classified,
//! parsed with a per-client strategy, normalized into one canonical
//! [`Invoice`] model, enriched from a product catalog, and recorded in a
//! content-hash ledger so every distinct document is processed at most once.
//!
//! All monetary values and quantities use [`rust_decimal::Decimal`], never
//! floating point.
//!
//! ## Quick Start
//!
//! ```rust
//! use facturacol::core::*;
//! use rust_decimal_macros::dec;
//!
//! // Somex PDFs mix both decimal conventions.
//! assert_eq!(parse_colombian_number("9.778.875,00").unwrap(), dec!(9778875));
//! assert_eq!(parse_colombian_number("9,778,875.00").unwrap(), dec!(9778875));
//!
//! // Bundles of "X 40 KILOS" products are rescaled to kilos.
//! assert_eq!(kilos_in_name("SAL SOMEX CEBA X 40 KILOS"), Some(dec!(40)));
//!
//! let ledger = MemoryLedger::new();
//! assert!(ledger.mark_processed(b"<Invoice/>", DocumentMetadata::default()).unwrap());
//! assert!(!ledger.mark_processed(b"<Invoice/>", DocumentMetadata::default()).unwrap());
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Canonical model, number normalization, catalog, client config, in-memory ledger |
//! | `ubl` | Document classification, standard and Somex UBL parsing, batch engine |
//! | `pdf` | Somex PDF table extraction |
//! | `sqlite` | SQLite-backed ledger |
//! | `archive` | ZIP container processing |
//! | `all` | Everything |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "ubl")]
pub mod ubl;

#[cfg(feature = "ubl")]
pub mod engine;

#[cfg(feature = "pdf")]
pub mod pdf;

#[cfg(feature = "sqlite")]
pub mod sqlite;

// Re-export core types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;
