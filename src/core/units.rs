//! UN/ECE Recommendation 20 unit codes mapped to the short codes the
//! export layout expects (KG, GR, LT, MT, UN).

/// Map a unit code to its canonical short code.
///
/// Unknown codes are passed through unchanged (trimmed).
pub fn map_unit_code(code: &str) -> String {
    canonical(code).unwrap_or(code.trim()).to_string()
}

/// Check whether `code` has a canonical mapping.
pub fn is_known_unit_code(code: &str) -> bool {
    canonical(code).is_some()
}

fn canonical(code: &str) -> Option<&'static str> {
    let upper = code.trim().to_ascii_uppercase();
    UNIT_CODE_MAP
        .binary_search_by(|(source, _)| (*source).cmp(upper.as_str()))
        .ok()
        .map(|idx| UNIT_CODE_MAP[idx].1)
}

/// Sorted by source code for binary search.
static UNIT_CODE_MAP: &[(&str, &str)] = &[
    ("94", "KG"),  // DIAN: kilogram
    ("C62", "UN"), // One
    ("EA", "UN"),  // Each
    ("GRM", "GR"), // Gram
    ("H87", "UN"), // Piece
    ("KGM", "KG"), // Kilogram
    ("LTR", "LT"), // Litre
    ("MTR", "MT"), // Metre
    ("NIU", "UN"), // Number of international units
];
