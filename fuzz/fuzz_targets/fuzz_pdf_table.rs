#![no_main]

use facturacol::core::{DEFAULT_SUBYACENTE_CODE, Inventory, ParseContext};
use facturacol::pdf::{PdfContent, PdfPage};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Page text as extracted from a PDF; exercises header patterns and
        // table reconstruction without a PDF parser in the loop.
        let content = PdfContent {
            pages: vec![PdfPage::from_text(1, s.to_string())],
        };
        let inventory = Inventory::new();
        let ctx = ParseContext::new(&inventory, DEFAULT_SUBYACENTE_CODE);
        let _ = facturacol::pdf::parse_somex_pdf(&content, &ctx);
    }
});
