//! Single streaming pass that collects every UBL field the dialect
//! builders need. Elements are matched by local name only, so any
//! namespace prefix convention is accepted.

use chrono::NaiveDate;
use quick_xml::events::BytesStart;

use super::xml_utils::{XmlVisitor, attribute, ends_with, position_of, walk};
use crate::core::IngestError;

/// Identification, naming and location fields of one `cac:Party`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PartyFields {
    pub company_id: Option<String>,
    pub party_name: Option<String>,
    pub legal_name: Option<String>,
    pub tax_registration_name: Option<String>,
    pub tax_city: Option<String>,
    pub physical_city: Option<String>,
    pub postal_city: Option<String>,
}

impl PartyFields {
    fn capture(&mut self, rel: &[String], text: &str) {
        let slot = if ends_with(rel, &["PartyTaxScheme", "CompanyID"]) {
            &mut self.company_id
        } else if ends_with(rel, &["PartyTaxScheme", "RegistrationName"]) {
            &mut self.tax_registration_name
        } else if ends_with(rel, &["RegistrationAddress", "CityName"]) {
            &mut self.tax_city
        } else if ends_with(rel, &["PartyName", "Name"]) {
            &mut self.party_name
        } else if ends_with(rel, &["PartyLegalEntity", "RegistrationName"]) {
            &mut self.legal_name
        } else if ends_with(rel, &["PhysicalLocation", "Address", "CityName"]) {
            &mut self.physical_city
        } else if ends_with(rel, &["PostalAddress", "CityName"]) {
            &mut self.postal_city
        } else {
            return;
        };
        set_first(slot, text.trim());
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Trading name, then legal registration name, then tax registration name.
    pub fn display_name(&self) -> Option<&str> {
        self.party_name
            .as_deref()
            .or(self.legal_name.as_deref())
            .or(self.tax_registration_name.as_deref())
    }

    /// Tax registration name first, as printed on the RUT.
    pub fn registered_name(&self) -> Option<&str> {
        self.tax_registration_name
            .as_deref()
            .or(self.party_name.as_deref())
            .or(self.legal_name.as_deref())
    }

    pub fn city(&self) -> Option<&str> {
        self.physical_city
            .as_deref()
            .or(self.tax_city.as_deref())
            .or(self.postal_city.as_deref())
    }
}

/// Raw text of one `cac:InvoiceLine`.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawLine {
    pub note: Option<String>,
    pub description: Option<String>,
    pub name: Option<String>,
    pub sellers_id: Option<String>,
    pub standard_id: Option<String>,
    pub quantity: Option<String>,
    pub unit_code: Option<String>,
    pub price: Option<String>,
    pub line_extension: Option<String>,
    pub taxable_amount: Option<String>,
    pub category_percent: Option<String>,
    pub subtotal_percent: Option<String>,
    pub weight: Option<String>,
    /// `(name, value)` pairs of `AdditionalItemProperty` and friends.
    pub properties: Vec<(String, String)>,
    pending_property: (Option<String>, Option<String>),
}

impl RawLine {
    fn capture(&mut self, rel: &[String], text: &str) {
        let text = text.trim();
        if rel.len() >= 2 && rel[rel.len() - 2].ends_with("ItemProperty") {
            match rel[rel.len() - 1].as_str() {
                "Name" => set_first(&mut self.pending_property.0, text),
                "Value" => set_first(&mut self.pending_property.1, text),
                _ => {}
            }
            return;
        }

        let in_tax_total = rel.first().is_some_and(|r| r == "TaxTotal");
        let slot = match rel {
            [leaf] if leaf == "Note" => &mut self.note,
            [leaf] if leaf == "InvoicedQuantity" => &mut self.quantity,
            [leaf] if leaf == "LineExtensionAmount" => &mut self.line_extension,
            _ if in_tax_total && ends_with(rel, &["TaxSubtotal", "TaxableAmount"]) => {
                &mut self.taxable_amount
            }
            _ if in_tax_total && ends_with(rel, &["TaxCategory", "Percent"]) => {
                &mut self.category_percent
            }
            _ if in_tax_total && ends_with(rel, &["TaxSubtotal", "Percent"]) => {
                &mut self.subtotal_percent
            }
            _ if ends_with(rel, &["Item", "Description"]) => &mut self.description,
            _ if ends_with(rel, &["Item", "Name"]) => &mut self.name,
            _ if ends_with(rel, &["SellersItemIdentification", "ID"]) => &mut self.sellers_id,
            _ if ends_with(rel, &["StandardItemIdentification", "ID"]) => &mut self.standard_id,
            _ if ends_with(rel, &["Price", "PriceAmount"]) => &mut self.price,
            _ if ends_with(rel, &["Weight"]) || ends_with(rel, &["NetWeight"]) => &mut self.weight,
            _ => return,
        };
        set_first(slot, text);
    }

    fn finish_property(&mut self) {
        if let (Some(name), Some(value)) = std::mem::take(&mut self.pending_property) {
            self.properties.push((name, value));
        }
    }

    /// Tax rate: category percent, falling back to the subtotal percent.
    pub fn tax_percent(&self) -> Option<&str> {
        self.category_percent
            .as_deref()
            .or(self.subtotal_percent.as_deref())
    }

    /// Value of the first property whose name contains any of `needles`
    /// (case-insensitive).
    pub fn property_containing(&self, needles: &[&str]) -> Option<&str> {
        self.properties
            .iter()
            .find(|(name, _)| {
                let name = name.to_lowercase();
                needles.iter().any(|n| name.contains(n))
            })
            .map(|(_, value)| value.as_str())
    }
}

/// Every field of a UBL document that the builders read.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawUbl {
    pub root: String,
    pub id: Option<String>,
    pub issue_date: Option<String>,
    pub due_date: Option<String>,
    pub payment_due_date: Option<String>,
    pub currency: Option<String>,
    pub note: Option<String>,
    pub order_reference: Option<String>,
    pub supplier: PartyFields,
    pub customer: PartyFields,
    pub receiver: PartyFields,
    pub delivery_city: Option<String>,
    pub lines: Vec<RawLine>,
    current_line: Option<RawLine>,
}

impl RawUbl {
    /// Due date, falling back to the payment means due date.
    pub fn payment_date(&self) -> Option<NaiveDate> {
        self.due_date
            .as_deref()
            .and_then(|d| parse_date(d).ok())
            .or_else(|| {
                self.payment_due_date
                    .as_deref()
                    .and_then(|d| parse_date(d).ok())
            })
    }

    /// Non-empty root `cbc:ID`.
    pub fn invoice_id(&self) -> Result<String, IngestError> {
        non_empty(self.id.as_deref())
            .ok_or_else(|| IngestError::Parse("missing invoice number (cbc:ID)".into()))
    }

    pub fn invoice_date(&self) -> Result<NaiveDate, IngestError> {
        let raw = non_empty(self.issue_date.as_deref())
            .ok_or_else(|| IngestError::Parse("missing cbc:IssueDate".into()))?;
        parse_date(&raw)
    }
}

impl XmlVisitor for RawUbl {
    fn start(&mut self, path: &[String], element: &BytesStart<'_>) {
        match path.last().map(String::as_str) {
            Some("InvoiceLine") => self.current_line = Some(RawLine::default()),
            Some("InvoicedQuantity") => {
                if let Some(line) = self.current_line.as_mut() {
                    if line.unit_code.is_none() {
                        line.unit_code = attribute(element, "unitCode");
                    }
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, path: &[String], text: &str) {
        if let (Some(idx), Some(line)) = (position_of(path, "InvoiceLine"), self.current_line.as_mut())
        {
            line.capture(&path[idx + 1..], text);
            return;
        }

        if path.len() == 2 {
            let slot = match path[1].as_str() {
                "ID" => &mut self.id,
                "IssueDate" => &mut self.issue_date,
                "DueDate" => &mut self.due_date,
                "DocumentCurrencyCode" => &mut self.currency,
                "Note" => &mut self.note,
                _ => return,
            };
            set_first(slot, text.trim());
            return;
        }

        if path.len() == 3 && ends_with(path, &["OrderReference", "ID"]) {
            set_first(&mut self.order_reference, text.trim());
        } else if ends_with(path, &["PaymentMeans", "PaymentDueDate"]) {
            set_first(&mut self.payment_due_date, text.trim());
        } else if let Some(idx) = position_of(path, "AccountingSupplierParty") {
            self.supplier.capture(&path[idx + 1..], text);
        } else if let Some(idx) = position_of(path, "AccountingCustomerParty") {
            self.customer.capture(&path[idx + 1..], text);
        } else if let Some(idx) = position_of(path, "ReceiverParty") {
            self.receiver.capture(&path[idx + 1..], text);
        } else if ends_with(path, &["DeliveryLocation", "Address", "CityName"]) {
            set_first(&mut self.delivery_city, text.trim());
        }
    }

    fn end(&mut self, _path: &[String], name: &str) {
        if name == "InvoiceLine" {
            if let Some(line) = self.current_line.take() {
                self.lines.push(line);
            }
        } else if name.ends_with("ItemProperty") {
            if let Some(line) = self.current_line.as_mut() {
                line.finish_property();
            }
        }
    }
}

/// Scan a UBL document. Fails only on malformed XML.
pub(crate) fn scan_ubl(xml: &str) -> Result<RawUbl, IngestError> {
    let mut raw = RawUbl::default();
    let root = walk(xml, &mut raw)?;
    raw.root = root;
    Ok(raw)
}

/// Parse an ISO `YYYY-MM-DD` date.
pub(crate) fn parse_date(value: &str) -> Result<NaiveDate, IngestError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| IngestError::Parse(format!("invalid date '{value}': {e}")))
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn set_first(slot: &mut Option<String>, text: &str) {
    if slot.is_none() && !text.is_empty() {
        *slot = Some(text.to_string());
    }
}
