use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while classifying, parsing or recording a document.
///
/// None of these abort a batch: the engine records the failure against the
/// offending document and moves on to the next one.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IngestError {
    /// Unrecognized envelope or payload kind.
    #[error("classification error: {0}")]
    Classification(String),

    /// Missing required element, or an embedded payload that is not valid XML.
    #[error("parse error: {0}")]
    Parse(String),

    /// A decimal or quantity that could not be read.
    #[error("numeric parse error: {0}")]
    NumericParse(String),

    /// A PDF page without a recognizable product table.
    #[error("product table not found: {0}")]
    TableNotFound(String),

    /// The document content was already recorded in the ledger.
    #[error("duplicate document: {0}")]
    Duplicate(String),

    /// Ledger storage failure.
    #[error("ledger error: {0}")]
    Ledger(String),

    /// Container (ZIP) could not be read.
    #[error("archive error: {0}")]
    Archive(String),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Category of a non-fatal problem found while parsing a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// A number could not be read and zero was substituted.
    NumericParse,
    /// No "X <n> KILO" marker in a Somex product name; quantity left unscaled.
    KilosNotFound,
    /// Unit price derivation hit a zero or negative quantity; price forced to zero.
    NonPositiveQuantity,
    /// The PDF carries no product table.
    TableNotFound,
    /// The invoice header was read but no line items were found.
    NoItems,
    /// A PDF table row could not be read and was skipped.
    MalformedRow,
}

/// A non-fatal problem attached to a parsed invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseWarning {
    /// Zero-based index of the affected item, `None` for invoice-level warnings.
    pub line: Option<usize>,
    pub kind: WarningKind,
    pub message: String,
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "[{:?}] line {}: {}", self.kind, line + 1, self.message),
            None => write!(f, "[{:?}] {}", self.kind, self.message),
        }
    }
}

impl ParseWarning {
    /// Create an invoice-level warning.
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            line: None,
            kind,
            message: message.into(),
        }
    }

    /// Create a warning attached to the item at `line`.
    pub fn at_line(line: usize, kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            line: Some(line),
            kind,
            message: message.into(),
        }
    }
}
