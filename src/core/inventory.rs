//! Product catalog used to fill in weight and unit of measure.
//!
//! The catalog is imported wholesale before a run and is read-only while
//! invoices are processed. Lookups match the trimmed, lower-cased product
//! name exactly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use tracing::{info, warn};

use super::error::IngestError;
use super::numbers::parse_colombian_number;
use super::types::InvoiceItem;
use super::units::map_unit_code;

/// One catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Lookup key: trimmed, case-folded description.
    pub normalized_description: String,
    pub code: String,
    pub weight: Option<Decimal>,
    pub unit_of_measure: String,
}

impl InventoryItem {
    pub fn new(
        description: &str,
        code: impl Into<String>,
        weight: Option<Decimal>,
        unit_of_measure: impl Into<String>,
    ) -> Self {
        Self {
            normalized_description: normalize_name(description),
            code: code.into(),
            weight,
            unit_of_measure: unit_of_measure.into(),
        }
    }
}

/// Counts reported after an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InventoryStats {
    pub total_items: usize,
    pub items_with_weight: usize,
    pub items_without_weight: usize,
}

/// In-memory catalog indexed by normalized description.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    items: HashMap<String, InventoryItem>,
}

/// Trim and case-fold a product name into a lookup key.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from items; later duplicates replace earlier ones.
    pub fn from_items(items: impl IntoIterator<Item = InventoryItem>) -> Self {
        let mut inventory = Self::new();
        inventory.replace(items);
        inventory
    }

    /// Replace the whole index with `items`.
    pub fn replace(&mut self, items: impl IntoIterator<Item = InventoryItem>) {
        self.items.clear();
        for item in items {
            self.items.insert(item.normalized_description.clone(), item);
        }
    }

    /// Look up a product by name.
    pub fn lookup(&self, product_name: &str) -> Option<&InventoryItem> {
        if self.items.is_empty() {
            return None;
        }
        self.items.get(&normalize_name(product_name))
    }

    /// Fill `item.weight` from the catalog entry matching its product name.
    ///
    /// With `override_unit` the catalog unit also replaces the item's unit.
    /// A catalog entry without weight leaves the item's weight untouched.
    /// Returns `true` on a catalog hit.
    pub fn enrich(&self, item: &mut InvoiceItem, override_unit: bool) -> bool {
        let Some(entry) = self.lookup(&item.product_name) else {
            return false;
        };
        if entry.weight.is_some() {
            item.weight = entry.weight;
        }
        if override_unit && !entry.unit_of_measure.trim().is_empty() {
            item.unit_of_measure = map_unit_code(&entry.unit_of_measure.to_uppercase());
        }
        true
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn stats(&self) -> InventoryStats {
        let with_weight = self.items.values().filter(|i| i.weight.is_some()).count();
        InventoryStats {
            total_items: self.items.len(),
            items_with_weight: with_weight,
            items_without_weight: self.items.len() - with_weight,
        }
    }

    /// Replace the catalog with the rows of a CSV export.
    ///
    /// Expected headers (matched case-insensitively, ignoring spaces and `/`):
    /// `Codigo`, `Descripcion`, `PESO`, `U/M`. When a header is missing the
    /// column falls back to its position in that order. Rows without a
    /// description are skipped. Returns the number of imported rows.
    pub fn import_csv<R: Read>(&mut self, reader: R) -> Result<usize, IngestError> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr
            .headers()
            .map_err(|e| IngestError::Parse(format!("catalog header: {e}")))?
            .clone();
        let columns = CatalogColumns::resolve(&headers);

        let mut items = Vec::new();
        for (idx, record) in rdr.records().enumerate() {
            let row = idx + 2;
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    warn!(row, "skipping unreadable catalog row: {e}");
                    continue;
                }
            };
            let field = |col: usize| record.get(col).unwrap_or("").trim();

            let description = field(columns.description);
            if description.is_empty() {
                continue;
            }

            let raw_weight = field(columns.weight);
            let weight = if raw_weight.is_empty() {
                None
            } else {
                match parse_colombian_number(raw_weight) {
                    Ok(w) => Some(w),
                    Err(_) => {
                        warn!(row, weight = raw_weight, "could not parse catalog weight");
                        None
                    }
                }
            };

            items.push(InventoryItem::new(
                description,
                field(columns.code),
                weight,
                field(columns.unit),
            ));
        }

        let imported = items.len();
        self.replace(items);
        info!(imported, distinct = self.len(), "catalog imported");
        Ok(imported)
    }
}

struct CatalogColumns {
    code: usize,
    description: usize,
    weight: usize,
    unit: usize,
}

impl CatalogColumns {
    fn resolve(headers: &csv::StringRecord) -> Self {
        let find = |expected: &str, fallback: usize| {
            headers
                .iter()
                .position(|h| {
                    let h: String = h
                        .chars()
                        .filter(|c| !c.is_whitespace() && *c != '/')
                        .collect();
                    h.eq_ignore_ascii_case(expected)
                })
                .unwrap_or(fallback)
        };
        Self {
            code: find("codigo", 0),
            description: find("descripcion", 1),
            weight: find("peso", 2),
            unit: find("um", 3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn lookup_is_trimmed_and_case_folded() {
        let inv = Inventory::from_items([InventoryItem::new(
            "  Arroz Diana 500g ",
            "A-1",
            Some(dec!(0.5)),
            "KG",
        )]);
        let hit = inv.lookup("ARROZ DIANA 500G").unwrap();
        assert_eq!(hit.code, "A-1");
        assert_eq!(hit.weight, Some(dec!(0.5)));
        assert!(inv.lookup("arroz diana").is_none());
    }

    fn item(name: &str) -> InvoiceItem {
        InvoiceItem {
            product_name: name.into(),
            product_code: "P1".into(),
            subyacente_code: "SPN-1".into(),
            quantity: dec!(2),
            quantity_original: dec!(2),
            unit_of_measure: "UN".into(),
            unit_price: dec!(10),
            tax_percentage: dec!(19),
            weight: None,
        }
    }

    #[test]
    fn enrich_fills_weight_and_optionally_unit() {
        let inv = Inventory::from_items([
            InventoryItem::new("Melaza", "M1", Some(dec!(25)), "kgm"),
            InventoryItem::new("Sal", "S1", None, "KG"),
        ]);

        let mut melaza = item(" MELAZA ");
        assert!(inv.enrich(&mut melaza, true));
        assert_eq!(melaza.weight, Some(dec!(25)));
        assert_eq!(melaza.unit_of_measure, "KG");

        let mut kept_unit = item("melaza");
        assert!(inv.enrich(&mut kept_unit, false));
        assert_eq!(kept_unit.unit_of_measure, "UN");

        let mut sal = item("sal");
        sal.weight = Some(dec!(1));
        assert!(inv.enrich(&mut sal, false));
        assert_eq!(sal.weight, Some(dec!(1)));

        let mut unknown = item("azucar");
        assert!(!inv.enrich(&mut unknown, true));
        assert_eq!(unknown, item("azucar"));
    }

    #[test]
    fn import_replaces_previous_catalog() {
        let mut inv = Inventory::from_items([InventoryItem::new("old", "O", None, "UN")]);
        let data = "Codigo,Descripcion,PESO,U/M\nC1,Azucar Manuelita,\"2,5\",KG\nC2,,1,UN\n";
        let imported = inv.import_csv(data.as_bytes()).unwrap();
        assert_eq!(imported, 1);
        assert!(inv.lookup("old").is_none());
        let item = inv.lookup("azucar manuelita").unwrap();
        assert_eq!(item.weight, Some(dec!(2.5)));
        assert_eq!(item.unit_of_measure, "KG");
    }

    #[test]
    fn import_matches_headers_in_any_order() {
        let data = "u / m, peso ,DESCRIPCION,codigo\nLT,abc,Aceite,X9\nUN,3,Jabon,X10\n";
        let mut inv = Inventory::new();
        assert_eq!(inv.import_csv(data.as_bytes()).unwrap(), 2);
        let aceite = inv.lookup("aceite").unwrap();
        assert_eq!(aceite.code, "X9");
        assert_eq!(aceite.unit_of_measure, "LT");
        assert_eq!(aceite.weight, None);
        assert_eq!(
            inv.stats(),
            InventoryStats {
                total_items: 2,
                items_with_weight: 1,
                items_without_weight: 1,
            }
        );
    }
}
