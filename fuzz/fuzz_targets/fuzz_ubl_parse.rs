#![no_main]

use facturacol::core::{DEFAULT_SUBYACENTE_CODE, Inventory, ParseContext};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let inventory = Inventory::new();
        let ctx = ParseContext::new(&inventory, DEFAULT_SUBYACENTE_CODE);
        let _ = facturacol::ubl::parse_standard(s, &ctx);
        let _ = facturacol::ubl::parse_somex(s, Some(s), &ctx);
    }
});
