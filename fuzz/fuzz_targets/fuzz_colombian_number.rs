#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = facturacol::core::parse_colombian_number(s);
        let _ = facturacol::core::kilos_in_name(s);
    }
});
