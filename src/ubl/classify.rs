//! Envelope and payload detection.

use quick_xml::events::BytesStart;
use tracing::debug;

use super::xml_utils::{XmlVisitor, ends_with, walk};
use crate::core::IngestError;

/// How far into a document the `%PDF-` marker may appear.
const PDF_MAGIC_WINDOW: usize = 1024;

/// A document after envelope detection, ready for a parser strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedDocument {
    /// A UBL invoice submitted directly.
    BareInvoice(String),
    /// A UBL invoice unwrapped from an `AttachedDocument`.
    WrappedInvoice { invoice: String, envelope: String },
    /// PDF bytes, for table-based extraction.
    PdfInvoice(Vec<u8>),
}

impl ClassifiedDocument {
    /// The invoice XML, for either XML kind.
    pub fn invoice_xml(&self) -> Option<&str> {
        match self {
            Self::BareInvoice(xml) => Some(xml),
            Self::WrappedInvoice { invoice, .. } => Some(invoice),
            Self::PdfInvoice(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::BareInvoice(_) => "bare invoice",
            Self::WrappedInvoice { .. } => "AttachedDocument",
            Self::PdfInvoice(_) => "PDF",
        }
    }
}

/// Classify raw document bytes.
///
/// XML whose root is an `AttachedDocument` is unwrapped; any other
/// well-formed XML is a bare invoice. Input that is not well-formed XML is
/// accepted as PDF only when `accept_pdf` is set and it carries the PDF
/// magic; otherwise it is a [`IngestError::Classification`] error.
pub fn classify(bytes: &[u8], accept_pdf: bool) -> Result<ClassifiedDocument, IngestError> {
    let xml_error = match decode_xml(bytes) {
        Ok(text) => {
            let mut scan = EnvelopeScan::default();
            match walk(text, &mut scan) {
                Ok(root) if root.contains("AttachedDocument") => {
                    let invoice = scan.unwrap_invoice()?;
                    debug!("classified as AttachedDocument envelope");
                    return Ok(ClassifiedDocument::WrappedInvoice {
                        invoice,
                        envelope: text.to_string(),
                    });
                }
                Ok(root) => {
                    debug!(root = %root, "classified as bare XML document");
                    return Ok(ClassifiedDocument::BareInvoice(text.to_string()));
                }
                Err(e) => e.to_string(),
            }
        }
        Err(reason) => reason,
    };

    if accept_pdf && has_pdf_magic(bytes) {
        debug!("classified as PDF");
        return Ok(ClassifiedDocument::PdfInvoice(bytes.to_vec()));
    }
    Err(IngestError::Classification(format!(
        "neither XML nor an accepted PDF ({xml_error})"
    )))
}

/// Unwrap the invoice carried by an `AttachedDocument` envelope.
pub fn unwrap_attached_document(envelope: &str) -> Result<String, IngestError> {
    let mut scan = EnvelopeScan::default();
    let root = walk(envelope, &mut scan)?;
    if !root.contains("AttachedDocument") {
        return Err(IngestError::Classification(format!(
            "root <{root}> is not an AttachedDocument"
        )));
    }
    scan.unwrap_invoice()
}

fn decode_xml(bytes: &[u8]) -> Result<&str, String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let text = std::str::from_utf8(bytes).map_err(|e| format!("not UTF-8: {e}"))?;
    if text.trim_start().starts_with('<') {
        Ok(text)
    } else {
        Err("content does not start with markup".into())
    }
}

fn has_pdf_magic(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(PDF_MAGIC_WINDOW)];
    head.windows(5).any(|w| w == b"%PDF-")
}

/// Collects every `Attachment/ExternalReference/Description` text.
#[derive(Default)]
struct EnvelopeScan {
    /// `(directly under the root, text)`
    candidates: Vec<(bool, String)>,
    current: Option<(bool, String)>,
}

const DESCRIPTION_PATH: [&str; 3] = ["Attachment", "ExternalReference", "Description"];

impl XmlVisitor for EnvelopeScan {
    fn start(&mut self, path: &[String], _element: &BytesStart<'_>) {
        if ends_with(path, &DESCRIPTION_PATH) {
            self.current = Some((path.len() == 4, String::new()));
        }
    }

    fn text(&mut self, path: &[String], text: &str) {
        if let Some((_, buf)) = self.current.as_mut() {
            if ends_with(path, &DESCRIPTION_PATH) {
                buf.push_str(text);
            }
        }
    }

    fn end(&mut self, path: &[String], name: &str) {
        if name == "Description" && ends_with(path, &DESCRIPTION_PATH[..2]) {
            if let Some(candidate) = self.current.take() {
                self.candidates.push(candidate);
            }
        }
    }
}

impl EnvelopeScan {
    fn unwrap_invoice(self) -> Result<String, IngestError> {
        let mut ordered: Vec<&String> = Vec::with_capacity(self.candidates.len());
        ordered.extend(self.candidates.iter().filter(|(top, _)| *top).map(|(_, t)| t));
        ordered.extend(self.candidates.iter().filter(|(top, _)| !*top).map(|(_, t)| t));

        let Some(first) = ordered.first() else {
            return Err(IngestError::Parse(
                "AttachedDocument has no Attachment/ExternalReference/Description".into(),
            ));
        };
        let chosen = ordered
            .iter()
            .find(|t| t.contains("Invoice"))
            .unwrap_or(first);
        decode_payload(chosen)
    }
}

/// Strip CDATA markers and check the payload is an `Invoice` document.
fn decode_payload(raw: &str) -> Result<String, IngestError> {
    let mut payload = raw.trim().trim_start_matches('\u{feff}');
    if let Some(inner) = payload.strip_prefix("<![CDATA[") {
        payload = inner.strip_suffix("]]>").unwrap_or(inner).trim();
    }

    if !payload.starts_with('<') || !payload.contains("Invoice") {
        return Err(IngestError::Parse(
            "decode error: embedded payload is not an XML invoice".into(),
        ));
    }

    struct Root;
    impl XmlVisitor for Root {
        fn text(&mut self, _path: &[String], _text: &str) {}
    }
    let root = walk(payload, &mut Root)
        .map_err(|e| IngestError::Parse(format!("decode error: embedded invoice: {e}")))?;
    if root != "Invoice" {
        return Err(IngestError::Parse(format!(
            "decode error: embedded root is <{root}>, expected <Invoice>"
        )));
    }
    Ok(payload.to_string())
}
