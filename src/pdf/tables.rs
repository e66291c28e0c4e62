//! Product tables rebuilt from extracted page text.
//!
//! Cells are separated by tabs, `|`, or runs of two or more spaces. A table
//! starts at a line with at least three cells and continues while lines
//! have at least two.

use lazy_static::lazy_static;
use regex::Regex;

/// Rows of cells; the first row is the header.
pub type TextTable = Vec<Vec<String>>;

lazy_static! {
    static ref CELL_SEPARATOR: Regex =
        Regex::new(r"\t+|\s*\|\s*|\s{2,}").expect("valid cell separator");
}

/// Words that mark the header row of the product table.
const HEADER_KEYWORDS: [&str; 5] = ["referencia", "descripción", "descripcion", "cantidad", "kilos"];

/// Split one text line into trimmed cells.
pub fn split_cells(line: &str) -> Vec<String> {
    let line = line.trim().trim_matches('|').trim();
    if line.is_empty() {
        return Vec::new();
    }
    CELL_SEPARATOR
        .split(line)
        .map(|c| c.trim().to_string())
        .collect()
}

/// All tables found in `text`, in reading order.
pub fn tables_from_text(text: &str) -> Vec<TextTable> {
    let mut tables = Vec::new();
    let mut current: Option<TextTable> = None;

    for line in text.lines() {
        let cells = split_cells(line);
        match current.as_mut() {
            Some(table) if cells.len() >= 2 => table.push(cells),
            Some(_) => {
                tables.extend(current.take());
                if cells.len() >= 3 {
                    current = Some(vec![cells]);
                }
            }
            None if cells.len() >= 3 => current = Some(vec![cells]),
            None => {}
        }
    }
    tables.extend(current);
    tables
}

/// Whether a header row names any product-table column.
pub fn is_product_header(row: &[String]) -> bool {
    let text = row.join(" ").to_lowercase();
    HEADER_KEYWORDS.iter().any(|k| text.contains(k))
}

/// First table with a product header and at least one data row.
pub fn find_product_table(tables: &[TextTable]) -> Option<&TextTable> {
    tables
        .iter()
        .filter(|t| t.len() >= 2)
        .find(|t| is_product_header(&t[0]))
}

/// Column positions resolved from the header row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub reference: Option<usize>,
    pub description: Option<usize>,
    pub bundles: Option<usize>,
    pub kilos: Option<usize>,
    pub unit_price: Option<usize>,
    pub line_total: Option<usize>,
    pub tax_value: Option<usize>,
    pub tax_percent: Option<usize>,
    pub line: Option<usize>,
}

impl ColumnMap {
    /// Match header cells by substring; the first matching rule wins per
    /// cell and a later cell overrides an earlier one for the same column.
    pub fn from_header(header: &[String]) -> Self {
        let mut map = Self::default();
        for (idx, cell) in header.iter().enumerate() {
            let h = cell.trim().to_lowercase();
            if h.is_empty() {
                continue;
            }
            let slot = if h.contains("referencia") || h.contains("ref") {
                &mut map.reference
            } else if h.contains("descrip") {
                &mut map.description
            } else if h.contains("bultos") {
                &mut map.bundles
            } else if h.contains("kilos") || h.contains("kg") {
                &mut map.kilos
            } else if h.contains("precio") && h.contains("unitario") {
                &mut map.unit_price
            } else if h.contains("valor") && h.contains("total") {
                &mut map.line_total
            } else if h.contains("valor") && h.contains("iva") {
                &mut map.tax_value
            } else if h.contains("iva") && h.contains('%') {
                &mut map.tax_percent
            } else if h.contains('l') && h.contains("nea") {
                &mut map.line
            } else {
                continue;
            };
            *slot = Some(idx);
        }
        map
    }

    pub fn reference_idx(&self) -> usize {
        self.reference.unwrap_or(1)
    }

    pub fn description_idx(&self) -> usize {
        self.description.unwrap_or(2)
    }

    pub fn bundles_idx(&self) -> usize {
        self.bundles.unwrap_or(3)
    }

    pub fn kilos_idx(&self) -> usize {
        self.kilos.unwrap_or(4)
    }

    pub fn line_total_idx(&self) -> usize {
        self.line_total.unwrap_or(6)
    }

    pub fn tax_percent_idx(&self) -> usize {
        self.tax_percent.unwrap_or(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn splits_on_wide_gaps_tabs_and_pipes() {
        assert_eq!(
            split_cells("  1   A-100  SAL SOMEX X 40 KILOS\t10 "),
            row(&["1", "A-100", "SAL SOMEX X 40 KILOS", "10"])
        );
        assert_eq!(split_cells("| a | b |c|"), row(&["a", "b", "c"]));
        assert!(split_cells("   ").is_empty());
    }

    #[test]
    fn groups_lines_into_tables() {
        let text = "FACTURA No. 1\n\
            Línea  Referencia  Descripción  Cant.Bultos\n\
            1  A-1  SAL  10\n\
            2  A-2  MELAZA  5\n\
            \n\
            Subtotal  1.000\n\
            Observaciones generales";
        let tables = tables_from_text(text);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].len(), 3);
        assert_eq!(tables[0][2], row(&["2", "A-2", "MELAZA", "5"]));
        assert!(find_product_table(&tables).is_some());
    }

    #[test]
    fn header_keywords_are_required() {
        let tables = vec![vec![row(&["a", "b", "c"]), row(&["1", "2", "3"])]];
        assert!(find_product_table(&tables).is_none());
    }

    #[test]
    fn maps_columns_in_any_order() {
        let header = row(&[
            "Iva%",
            "Valor IVA",
            "Valor Total",
            "Precio Unitario",
            "Cant.Kilos",
            "Cant.Bultos",
            "Descripción",
            "Referencia",
            "Línea",
        ]);
        let map = ColumnMap::from_header(&header);
        assert_eq!(map.tax_percent, Some(0));
        assert_eq!(map.tax_value, Some(1));
        assert_eq!(map.line_total, Some(2));
        assert_eq!(map.unit_price, Some(3));
        assert_eq!(map.kilos, Some(4));
        assert_eq!(map.bundles, Some(5));
        assert_eq!(map.description, Some(6));
        assert_eq!(map.reference, Some(7));
        assert_eq!(map.line, Some(8));
    }

    #[test]
    fn unmapped_columns_use_default_positions() {
        let map = ColumnMap::from_header(&row(&["#", "Código", "Producto"]));
        assert_eq!(map.reference_idx(), 1);
        assert_eq!(map.description_idx(), 2);
        assert_eq!(map.bundles_idx(), 3);
        assert_eq!(map.kilos_idx(), 4);
        assert_eq!(map.line_total_idx(), 6);
        assert_eq!(map.tax_percent_idx(), 8);
    }
}
