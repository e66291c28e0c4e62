//! Durable dedup ledger backed by SQLite.
//!
//! ```no_run
//! use facturacol::core::{DedupLedger, DocumentMetadata};
//! use facturacol::sqlite::SqliteLedger;
//!
//! let ledger = SqliteLedger::open("data/ledger.db").unwrap();
//! let bytes = std::fs::read("factura.xml").unwrap();
//! if !ledger.is_processed(&bytes).unwrap() {
//!     ledger.mark_processed(&bytes, DocumentMetadata::default()).unwrap();
//! }
//! ```

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::core::{
    DedupLedger, DocumentMetadata, IngestError, ProcessedDocumentRecord, content_hash,
};

const MIGRATIONS: [(&str, &str); 1] = [(
    "001_create_processed_documents.sql",
    include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/migrations/001_create_processed_documents.sql"
    )),
)];

/// Ledger stored in a SQLite database file.
///
/// Marking is a single `INSERT OR IGNORE`, so concurrent workers racing on
/// the same content see exactly one winner.
pub struct SqliteLedger {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteLedger").finish_non_exhaustive()
    }
}

impl SqliteLedger {
    /// Open (or create) the ledger database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let conn = Connection::open(path.as_ref()).map_err(sql_error)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, IngestError> {
        let conn = Connection::open_in_memory().map_err(sql_error)?;
        Self::with_connection(conn)
    }

    fn with_connection(mut conn: Connection) -> Result<Self, IngestError> {
        run_migrations(&mut conn).map_err(sql_error)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, IngestError> {
        self.conn
            .lock()
            .map_err(|_| IngestError::Ledger("ledger connection lock poisoned".into()))
    }

    /// Record for a content hash, if present.
    pub fn record(&self, hash: &str) -> Result<Option<ProcessedDocumentRecord>, IngestError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT content_hash, source_filename, container_filename, processed_at,
                    derived_invoice_number, output_reference
             FROM processed_documents WHERE content_hash = ?1",
            params![hash],
            read_record,
        )
        .optional()
        .map_err(sql_error)?
        .transpose()
    }
}

fn run_migrations(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL
        );",
    )?;

    for (name, sql) in MIGRATIONS {
        let applied: Option<String> = conn
            .query_row(
                "SELECT name FROM schema_migrations WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        if applied.is_none() {
            let tx = conn.transaction()?;
            tx.execute_batch(sql)?;
            tx.execute(
                "INSERT INTO schema_migrations (name, applied_at) VALUES (?1, datetime('now'))",
                params![name],
            )?;
            tx.commit()?;
            debug!(migration = name, "ledger migration applied");
        }
    }
    Ok(())
}

fn sql_error(e: rusqlite::Error) -> IngestError {
    IngestError::Ledger(e.to_string())
}

type RecordRow = Result<ProcessedDocumentRecord, IngestError>;

fn read_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecordRow> {
    let processed_at: String = row.get(3)?;
    let record = DateTime::parse_from_rfc3339(&processed_at)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| IngestError::Ledger(format!("bad processed_at '{processed_at}': {e}")));
    Ok(match record {
        Ok(processed_at) => Ok(ProcessedDocumentRecord {
            content_hash: row.get(0)?,
            source_filename: row.get(1)?,
            container_filename: row.get(2)?,
            processed_at,
            derived_invoice_number: row.get(4)?,
            output_reference: row.get(5)?,
        }),
        Err(e) => Err(e),
    })
}

impl DedupLedger for SqliteLedger {
    fn is_processed(&self, content: &[u8]) -> Result<bool, IngestError> {
        let conn = self.conn()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM processed_documents WHERE content_hash = ?1",
                params![content_hash(content)],
                |row| row.get(0),
            )
            .optional()
            .map_err(sql_error)?;
        Ok(found.is_some())
    }

    fn mark_processed(
        &self,
        content: &[u8],
        metadata: DocumentMetadata,
    ) -> Result<bool, IngestError> {
        let conn = self.conn()?;
        let processed_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO processed_documents (
                    content_hash, source_filename, container_filename, processed_at,
                    derived_invoice_number, output_reference
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    content_hash(content),
                    metadata.source_filename,
                    metadata.container_filename,
                    processed_at,
                    metadata.derived_invoice_number,
                    metadata.output_reference,
                ],
            )
            .map_err(sql_error)?;
        Ok(inserted == 1)
    }

    fn records(&self) -> Result<Vec<ProcessedDocumentRecord>, IngestError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT content_hash, source_filename, container_filename, processed_at,
                        derived_invoice_number, output_reference
                 FROM processed_documents
                 ORDER BY processed_at DESC, rowid DESC",
            )
            .map_err(sql_error)?;
        let rows = stmt.query_map([], read_record).map_err(sql_error)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(sql_error)??);
        }
        Ok(records)
    }

    fn count(&self) -> Result<usize, IngestError> {
        let conn = self.conn()?;
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM processed_documents", [], |row| {
                row.get(0)
            })
            .map_err(sql_error)?;
        Ok(n as usize)
    }
}
