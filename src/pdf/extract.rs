use lopdf::Document;
use tracing::debug;

use super::layout::page_text;
use super::tables::{TextTable, find_product_table, tables_from_text};
use crate::core::IngestError;

/// Text and tables of one PDF page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfPage {
    /// 1-based page number.
    pub number: u32,
    pub text: String,
    pub tables: Vec<TextTable>,
}

impl PdfPage {
    pub fn from_text(number: u32, text: String) -> Self {
        let tables = tables_from_text(&text);
        Self {
            number,
            text,
            tables,
        }
    }
}

/// Everything read from a PDF document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfContent {
    pub pages: Vec<PdfPage>,
}

impl PdfContent {
    /// Concatenated text of all pages.
    pub fn full_text(&self) -> String {
        let mut text = String::new();
        for page in &self.pages {
            text.push_str(&page.text);
            text.push('\n');
        }
        text
    }

    pub fn first_page(&self) -> Option<&PdfPage> {
        self.pages.first()
    }

    /// Product table of the first page.
    pub fn product_table(&self) -> Result<&TextTable, IngestError> {
        let page = self
            .first_page()
            .ok_or_else(|| IngestError::TableNotFound("document has no pages".into()))?;
        find_product_table(&page.tables).ok_or_else(|| {
            IngestError::TableNotFound(format!(
                "no product table among {} table(s) on page {}",
                page.tables.len(),
                page.number
            ))
        })
    }
}

/// Extract page text with its layout rebuilt from text positions. A page
/// that yields nothing that way falls back to lopdf's plain extraction,
/// and a document with no text at all to pdf-extract.
pub fn extract_pages(bytes: &[u8]) -> Result<PdfContent, IngestError> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| IngestError::Parse(format!("failed to load PDF: {e}")))?;

    let page_ids = doc.get_pages();
    if page_ids.is_empty() {
        return Err(IngestError::Parse("PDF has no pages".into()));
    }

    let mut pages = Vec::with_capacity(page_ids.len());
    for (&number, &page_id) in &page_ids {
        let text = page_text(&doc, page_id)
            .map_err(|e| debug!(page = number, "positioned text extraction failed: {e}"))
            .ok()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| {
                doc.extract_text(&[number]).unwrap_or_else(|e| {
                    debug!(page = number, "lopdf text extraction failed: {e}");
                    String::new()
                })
            });
        pages.push(PdfPage::from_text(number, text));
    }

    if pages.iter().all(|p| p.text.trim().is_empty()) {
        debug!("no text from lopdf, falling back to pdf-extract");
        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| IngestError::Parse(format!("failed to extract PDF text: {e}")))?;
        pages = vec![PdfPage::from_text(1, text)];
    }

    debug!(pages = pages.len(), "PDF text extracted");
    Ok(PdfContent { pages })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_carry_their_tables() {
        let page = PdfPage::from_text(
            1,
            "Referencia  Descripción  Kilos\nA-1  SAL  40\n".to_string(),
        );
        assert_eq!(page.tables.len(), 1);
        let content = PdfContent {
            pages: vec![page, PdfPage::from_text(2, "Total  1.000".to_string())],
        };
        assert_eq!(content.first_page().map(|p| p.number), Some(1));
        assert!(content.full_text().contains("SAL  40\n"));
        assert!(content.full_text().ends_with("Total  1.000\n"));
        assert_eq!(content.product_table().unwrap()[1][0], "A-1");
    }

    #[test]
    fn missing_table_is_reported() {
        let content = PdfContent {
            pages: vec![PdfPage::from_text(1, "Subtotal  Total  IVA
1  2  3".to_string())],
        };
        assert!(matches!(
            content.product_table(),
            Err(IngestError::TableNotFound(_))
        ));
        assert!(PdfContent { pages: vec![] }.product_table().is_err());
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(
            extract_pages(b"%PDF-1.4 this is not a pdf"),
            Err(IngestError::Parse(_))
        ));
    }
}
