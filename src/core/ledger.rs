//! Content-hash based idempotency ledger.
//!
//! A document is identified by the SHA-256 of its exact bytes, so renamed
//! copies collapse to one record while a re-exported invoice (any byte
//! different) counts as new.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::error::IngestError;
use super::types::ProcessedDocumentRecord;

/// Hex SHA-256 of raw document bytes.
pub fn content_hash(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Descriptive fields recorded alongside a content hash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub source_filename: String,
    pub container_filename: Option<String>,
    pub derived_invoice_number: String,
    pub output_reference: Option<String>,
}

impl DocumentMetadata {
    fn into_record(self, content_hash: String) -> ProcessedDocumentRecord {
        ProcessedDocumentRecord {
            content_hash,
            source_filename: self.source_filename,
            container_filename: self.container_filename,
            processed_at: Utc::now(),
            derived_invoice_number: self.derived_invoice_number,
            output_reference: self.output_reference,
        }
    }
}

/// Summary of a ledger's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LedgerStats {
    pub total_processed: usize,
    pub last_processed_at: Option<DateTime<Utc>>,
}

/// Durable record of processed document contents.
///
/// `mark_processed` is the synchronization point of a batch: it must insert
/// atomically and report whether this call created the record.
pub trait DedupLedger: Send + Sync {
    /// Whether a document with these exact bytes was already recorded.
    fn is_processed(&self, content: &[u8]) -> Result<bool, IngestError>;

    /// Record the document. Returns `false` if its hash was already present,
    /// in which case the existing record is left untouched.
    fn mark_processed(&self, content: &[u8], metadata: DocumentMetadata)
    -> Result<bool, IngestError>;

    /// All records, newest first.
    fn records(&self) -> Result<Vec<ProcessedDocumentRecord>, IngestError>;

    /// Number of recorded documents.
    fn count(&self) -> Result<usize, IngestError> {
        Ok(self.records()?.len())
    }

    fn stats(&self) -> Result<LedgerStats, IngestError> {
        let records = self.records()?;
        Ok(LedgerStats {
            total_processed: records.len(),
            last_processed_at: records.first().map(|r| r.processed_at),
        })
    }
}

impl<L: DedupLedger + ?Sized> DedupLedger for &L {
    fn is_processed(&self, content: &[u8]) -> Result<bool, IngestError> {
        (**self).is_processed(content)
    }

    fn mark_processed(
        &self,
        content: &[u8],
        metadata: DocumentMetadata,
    ) -> Result<bool, IngestError> {
        (**self).mark_processed(content, metadata)
    }

    fn records(&self) -> Result<Vec<ProcessedDocumentRecord>, IngestError> {
        (**self).records()
    }

    fn count(&self) -> Result<usize, IngestError> {
        (**self).count()
    }

    fn stats(&self) -> Result<LedgerStats, IngestError> {
        (**self).stats()
    }
}

/// Ledger kept in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    records: DashMap<String, ProcessedDocumentRecord>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DedupLedger for MemoryLedger {
    fn is_processed(&self, content: &[u8]) -> Result<bool, IngestError> {
        Ok(self.records.contains_key(&content_hash(content)))
    }

    fn mark_processed(
        &self,
        content: &[u8],
        metadata: DocumentMetadata,
    ) -> Result<bool, IngestError> {
        let hash = content_hash(content);
        match self.records.entry(hash.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(metadata.into_record(hash));
                Ok(true)
            }
        }
    }

    fn records(&self) -> Result<Vec<ProcessedDocumentRecord>, IngestError> {
        let mut all: Vec<_> = self.records.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| b.processed_at.cmp(&a.processed_at));
        Ok(all)
    }

    fn count(&self) -> Result<usize, IngestError> {
        Ok(self.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(name: &str) -> DocumentMetadata {
        DocumentMetadata {
            source_filename: name.into(),
            container_filename: Some("batch.zip".into()),
            derived_invoice_number: "FE-1".into(),
            output_reference: None,
        }
    }

    #[test]
    fn hash_is_hex_sha256() {
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn marks_once_per_content() {
        let ledger = MemoryLedger::new();
        assert!(!ledger.is_processed(b"<Invoice/>").unwrap());
        assert!(ledger.mark_processed(b"<Invoice/>", meta("a.xml")).unwrap());
        assert!(ledger.is_processed(b"<Invoice/>").unwrap());
        assert!(!ledger.mark_processed(b"<Invoice/>", meta("b.xml")).unwrap());
        assert!(!ledger.is_processed(b"<Invoice />").unwrap());

        let records = ledger.records().unwrap();
        assert_eq!(records.len(), 1);
        let stats = ledger.stats().unwrap();
        assert_eq!(stats.total_processed, 1);
        assert_eq!(stats.last_processed_at, Some(records[0].processed_at));
        assert_eq!(records[0].source_filename, "a.xml");
        assert_eq!(records[0].content_hash, content_hash(b"<Invoice/>"));
    }
}
