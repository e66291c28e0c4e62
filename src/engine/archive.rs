//! ZIP containers as delivered by the mail and SFTP collectors.

use std::io::{Cursor, Read};

use tracing::{debug, warn};

use super::batch::{BatchReport, DocumentOutcome, DocumentStatus, Engine, SourceDocument};
use crate::core::{DedupLedger, IngestError, content_hash};

/// Upper bound on the buffer reserved from an entry's declared size.
const SIZE_HINT_LIMIT: u64 = 8 * 1024 * 1024;

/// Initial buffer size for an entry that claims `declared` bytes.
fn size_hint(declared: u64) -> usize {
    usize::try_from(declared.min(SIZE_HINT_LIMIT)).unwrap_or(0)
}

/// Read the invoice documents of a ZIP archive, in archive order.
///
/// `.xml` entries are always taken, `.pdf` entries only with `include_pdf`.
/// Directories and other entries are ignored; an entry that cannot be read
/// is logged and skipped.
pub fn extract_documents(
    archive_bytes: &[u8],
    container: &str,
    include_pdf: bool,
) -> Result<Vec<SourceDocument>, IngestError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(archive_bytes))
        .map_err(|e| IngestError::Archive(format!("{container}: {e}")))?;

    let mut documents = Vec::new();
    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(container, index, "skipping unreadable archive entry: {e}");
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let lower = name.to_lowercase();
        if !(lower.ends_with(".xml") || (include_pdf && lower.ends_with(".pdf"))) {
            debug!(container, entry = %name, "ignoring archive entry");
            continue;
        }

        let mut bytes = Vec::with_capacity(size_hint(entry.size()));
        if let Err(e) = entry.read_to_end(&mut bytes) {
            warn!(container, entry = %name, "skipping corrupt archive entry: {e}");
            continue;
        }
        documents.push(SourceDocument::new(name, bytes).in_container(container));
    }
    debug!(container, documents = documents.len(), "archive extracted");
    Ok(documents)
}

impl<L: DedupLedger> Engine<L> {
    /// Extract and process one ZIP archive.
    pub fn process_archive(
        &self,
        archive_bytes: &[u8],
        container: &str,
    ) -> Result<BatchReport, IngestError> {
        let documents =
            extract_documents(archive_bytes, container, self.strategies().accepts_pdf())?;
        Ok(self.process_batch(documents))
    }

    /// Process several archives into one report. An unreadable archive is
    /// reported as a failed outcome and does not stop the others.
    pub fn process_archives<'a>(
        &self,
        archives: impl IntoIterator<Item = (&'a str, &'a [u8])>,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        for (container, bytes) in archives {
            match self.process_archive(bytes, container) {
                Ok(part) => report.merge(part),
                Err(e) => {
                    warn!(container, "archive failed: {e}");
                    report.outcomes.push(DocumentOutcome {
                        filename: container.to_string(),
                        container: None,
                        content_hash: content_hash(bytes),
                        status: DocumentStatus::Failed(e.to_string()),
                    });
                }
            }
        }
        report
    }
}
