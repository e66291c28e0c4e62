//! Somex PDF invoices.
//!
//! Somex also delivers invoices as PDFs with no structured payload. The
//! header is recovered from the page text with ordered patterns and the
//! items from the product table of the first page, whose columns are
//! located by header text rather than position.
//!
//! # Example
//!
//! ```no_run
//! use facturacol::core::*;
//! use facturacol::pdf;
//!
//! let bytes = std::fs::read("factura.pdf").unwrap();
//! let inventory = Inventory::new();
//! let ctx = ParseContext::new(&inventory, DEFAULT_SUBYACENTE_CODE);
//! let invoice = pdf::parse_somex_pdf_bytes(&bytes, &ctx).unwrap();
//! for item in &invoice.items {
//!     println!("{} {} KG @ {}", item.product_code, item.quantity, item.unit_price);
//! }
//! ```

mod extract;
mod layout;
mod patterns;
mod somex;
mod tables;

pub use extract::{PdfContent, PdfPage, extract_pages};
pub use layout::{TextRun, layout_text, page_runs, page_text};
pub use somex::{parse_somex_pdf, parse_somex_pdf_bytes};
pub use tables::{ColumnMap, TextTable, find_product_table, split_cells, tables_from_text};
