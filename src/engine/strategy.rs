use crate::core::{ClientConfig, Dialect, IngestError, Invoice, ParseContext};
use crate::ubl::{self, ClassifiedDocument};

/// Parser for one document dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserStrategy {
    StandardUbl,
    SomexUbl,
    SomexPdf,
}

impl ParserStrategy {
    /// Parse a classified document into an [`Invoice`].
    ///
    /// A strategy only accepts the payload kind it was built for: XML
    /// strategies reject PDFs and vice versa.
    pub fn parse(
        &self,
        document: &ClassifiedDocument,
        ctx: &ParseContext<'_>,
    ) -> Result<Invoice, IngestError> {
        match (self, document) {
            (Self::StandardUbl, ClassifiedDocument::BareInvoice(xml))
            | (Self::StandardUbl, ClassifiedDocument::WrappedInvoice { invoice: xml, .. }) => {
                ubl::parse_standard(xml, ctx)
            }
            (Self::SomexUbl, ClassifiedDocument::BareInvoice(xml)) => {
                ubl::parse_somex(xml, None, ctx)
            }
            (Self::SomexUbl, ClassifiedDocument::WrappedInvoice { invoice, envelope }) => {
                ubl::parse_somex(invoice, Some(envelope), ctx)
            }
            (Self::SomexPdf, ClassifiedDocument::PdfInvoice(bytes)) => parse_pdf(bytes, ctx),
            (strategy, document) => Err(IngestError::Classification(format!(
                "{strategy:?} cannot parse a {} document",
                document.kind()
            ))),
        }
    }
}

#[cfg(feature = "pdf")]
fn parse_pdf(bytes: &[u8], ctx: &ParseContext<'_>) -> Result<Invoice, IngestError> {
    crate::pdf::parse_somex_pdf_bytes(bytes, ctx)
}

#[cfg(not(feature = "pdf"))]
fn parse_pdf(_bytes: &[u8], _ctx: &ParseContext<'_>) -> Result<Invoice, IngestError> {
    Err(IngestError::Classification(
        "PDF support is not compiled in (enable the `pdf` feature)".into(),
    ))
}

/// The strategies a client's documents are parsed with, resolved once from
/// its [`Dialect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategySet {
    pub xml: ParserStrategy,
    /// Present only for clients that accept PDF documents.
    pub pdf: Option<ParserStrategy>,
}

impl StrategySet {
    pub fn for_client(client: &ClientConfig) -> Self {
        let xml = match client.dialect {
            Dialect::Standard => ParserStrategy::StandardUbl,
            Dialect::Somex => ParserStrategy::SomexUbl,
        };
        let pdf = (client.accept_pdf && client.dialect == Dialect::Somex)
            .then_some(ParserStrategy::SomexPdf);
        Self { xml, pdf }
    }

    pub fn accepts_pdf(&self) -> bool {
        self.pdf.is_some()
    }

    /// Strategy for a classified document.
    pub fn select(&self, document: &ClassifiedDocument) -> Result<ParserStrategy, IngestError> {
        match document {
            ClassifiedDocument::PdfInvoice(_) => self.pdf.ok_or_else(|| {
                IngestError::Classification("client does not accept PDF documents".into())
            }),
            _ => Ok(self.xml),
        }
    }
}
