use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::strategy::StrategySet;
use crate::core::{
    ClientConfig, DedupLedger, DocumentMetadata, IngestError, Inventory, Invoice, ParseContext,
    content_hash,
};
use crate::ubl::classify;

/// Raw document bytes plus where they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub filename: String,
    /// Enclosing container, e.g. the ZIP the document was read from.
    pub container: Option<String>,
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            container: None,
            bytes: bytes.into(),
        }
    }

    pub fn in_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }
}

/// What happened to one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DocumentStatus {
    Parsed {
        invoice_number: String,
        item_count: usize,
    },
    /// Content already recorded in the ledger; skipped.
    Duplicate,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentOutcome {
    pub filename: String,
    pub container: Option<String>,
    pub content_hash: String,
    pub status: DocumentStatus,
}

/// Invoices and per-document outcomes of a batch, in input order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub invoices: Vec<Invoice>,
    pub outcomes: Vec<DocumentOutcome>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn processed(&self) -> usize {
        self.count(|s| matches!(s, DocumentStatus::Parsed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, DocumentStatus::Duplicate))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, DocumentStatus::Failed(_)))
    }

    /// Append another report, keeping order.
    pub fn merge(&mut self, other: BatchReport) {
        self.invoices.extend(other.invoices);
        self.outcomes.extend(other.outcomes);
    }

    fn count(&self, pred: impl Fn(&DocumentStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// Per-client ingestion engine.
///
/// Parsing runs in parallel; the ledger's `mark_processed` is the only
/// shared write, and a document is marked only after it parsed.
pub struct Engine<L> {
    client: ClientConfig,
    strategies: StrategySet,
    inventory: Inventory,
    ledger: L,
    output_reference: Option<String>,
}

impl<L: DedupLedger> Engine<L> {
    pub fn new(client: ClientConfig, inventory: Inventory, ledger: L) -> Self {
        let strategies = StrategySet::for_client(&client);
        Self {
            client,
            strategies,
            inventory,
            ledger,
            output_reference: None,
        }
    }

    /// Reference recorded in the ledger for every document of this run
    /// (e.g. the export file name).
    pub fn with_output_reference(mut self, reference: impl Into<String>) -> Self {
        self.output_reference = Some(reference.into());
        self
    }

    pub fn client(&self) -> &ClientConfig {
        &self.client
    }

    pub fn strategies(&self) -> StrategySet {
        self.strategies
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Swap in a freshly imported catalog.
    pub fn replace_inventory(&mut self, inventory: Inventory) {
        self.inventory = inventory;
    }

    /// Classify and parse one document without touching the ledger.
    pub fn parse(&self, bytes: &[u8]) -> Result<Invoice, IngestError> {
        let document = classify(bytes, self.strategies.accepts_pdf())?;
        let strategy = self.strategies.select(&document)?;
        debug!(?strategy, kind = document.kind(), "parsing document");
        let ctx = ParseContext::new(&self.inventory, &self.client.subyacente_code);
        strategy.parse(&document, &ctx)
    }

    /// Ingest one document: parse it and claim its content in the ledger.
    ///
    /// Content already recorded (before parsing, or claimed by a concurrent
    /// worker in the meantime) is an [`IngestError::Duplicate`]. A document
    /// that fails to parse is not recorded.
    pub fn ingest(&self, document: &SourceDocument) -> Result<Invoice, IngestError> {
        if self.ledger.is_processed(&document.bytes)? {
            return Err(IngestError::Duplicate(document.filename.clone()));
        }

        let invoice = self.parse(&document.bytes)?;
        let metadata = DocumentMetadata {
            source_filename: document.filename.clone(),
            container_filename: document.container.clone(),
            derived_invoice_number: invoice.invoice_number.clone(),
            output_reference: self.output_reference.clone(),
        };
        if !self.ledger.mark_processed(&document.bytes, metadata)? {
            debug!(file = %document.filename, "document claimed by another worker");
            return Err(IngestError::Duplicate(document.filename.clone()));
        }
        Ok(invoice)
    }

    /// Process one document into an outcome; duplicates and failures are
    /// reported, never raised.
    pub fn process_document(&self, document: &SourceDocument) -> (DocumentOutcome, Option<Invoice>) {
        let (status, invoice) = match self.ingest(document) {
            Ok(invoice) => {
                info!(
                    file = %document.filename,
                    invoice = %invoice.invoice_number,
                    items = invoice.items.len(),
                    "document processed"
                );
                let status = DocumentStatus::Parsed {
                    invoice_number: invoice.invoice_number.clone(),
                    item_count: invoice.items.len(),
                };
                (status, Some(invoice))
            }
            Err(IngestError::Duplicate(_)) => {
                info!(file = %document.filename, "skipping already processed document");
                (DocumentStatus::Duplicate, None)
            }
            Err(e) => {
                warn!(file = %document.filename, "document failed: {e}");
                (DocumentStatus::Failed(e.to_string()), None)
            }
        };

        let outcome = DocumentOutcome {
            filename: document.filename.clone(),
            container: document.container.clone(),
            content_hash: content_hash(&document.bytes),
            status,
        };
        (outcome, invoice)
    }

    /// Process documents in parallel. Output order follows input order.
    pub fn process_batch(&self, documents: Vec<SourceDocument>) -> BatchReport {
        let results: Vec<_> = documents
            .into_par_iter()
            .map(|doc| self.process_document(&doc))
            .collect();

        let mut report = BatchReport::default();
        for (outcome, invoice) in results {
            report.outcomes.push(outcome);
            report.invoices.extend(invoice);
        }
        info!(
            client = %self.client.id,
            total = report.total(),
            processed = report.processed(),
            skipped = report.skipped(),
            failed = report.failed(),
            "batch finished"
        );
        report
    }
}
