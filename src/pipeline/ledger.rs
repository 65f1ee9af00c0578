//! Dedup ledger: persistent set of already-announced transaction ids
//!
//! Append-only. An id once recorded is never removed, so a transaction
//! announced in any earlier run is never enqueued again.

use crate::sqlite_pragma::apply_durable_pragmas;
use rusqlite::{params, Connection};
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug)]
pub enum LedgerError {
    Io(std::io::Error),
    Database(String),
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Io(err)
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        LedgerError::Database(err.to_string())
    }
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::Io(e) => write!(f, "Ledger IO error: {}", e),
            LedgerError::Database(e) => write!(f, "Ledger database error: {}", e),
        }
    }
}

impl std::error::Error for LedgerError {}

/// Membership + idempotent insert over announced transaction ids
pub trait DedupLedger {
    /// True iff `tx_id` was recorded by this or any earlier run
    fn contains(&self, tx_id: &str) -> Result<bool, LedgerError>;

    /// Record `tx_id` as announced. Recording an existing id is a no-op.
    fn record(&mut self, tx_id: &str) -> Result<(), LedgerError>;
}

/// SQLite-backed ledger, one row per announced transaction
pub struct SqliteLedger {
    conn: Connection,
}

impl SqliteLedger {
    /// Open the ledger file, creating the file and table on first run
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        apply_durable_pragmas(&conn)?;
        Self::init_schema(&conn)?;

        log::info!("✅ Ledger opened: {}", db_path.display());
        Ok(Self { conn })
    }

    /// Non-persistent ledger, used for dry runs and tests
    pub fn open_in_memory() -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn init_schema(conn: &Connection) -> Result<(), LedgerError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS announced_transactions (
                tx_id TEXT PRIMARY KEY NOT NULL,
                announced_at INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Number of recorded transactions
    pub fn len(&self) -> Result<usize, LedgerError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM announced_transactions",
            [],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as usize)
    }

    pub fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.len()? == 0)
    }
}

impl DedupLedger for SqliteLedger {
    fn contains(&self, tx_id: &str) -> Result<bool, LedgerError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT 1 FROM announced_transactions WHERE tx_id = ?1")?;
        Ok(stmt.exists(params![tx_id])?)
    }

    fn record(&mut self, tx_id: &str) -> Result<(), LedgerError> {
        let now = chrono::Utc::now().timestamp();
        // Autocommit: each insert is its own durable transaction
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO announced_transactions (tx_id, announced_at) VALUES (?1, ?2)",
            params![tx_id, now],
        )?;

        if inserted == 0 {
            log::debug!("Ledger already contains {}", tx_id);
        }
        Ok(())
    }
}

/// Ledger wrapper that keeps ids whose write failed.
///
/// An unwritten id still counts as recorded for `contains`, so a sale that was
/// posted but not persisted is never enqueued again by this process. `flush`
/// retries the pending writes.
pub struct BufferedLedger<L> {
    inner: L,
    unwritten: BTreeSet<String>,
}

impl<L: DedupLedger> BufferedLedger<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            unwritten: BTreeSet::new(),
        }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    /// Ids announced but not yet persisted
    pub fn unwritten(&self) -> usize {
        self.unwritten.len()
    }

    /// Retry every failed write. Returns how many are still unwritten.
    pub fn flush(&mut self) -> usize {
        if self.unwritten.is_empty() {
            return 0;
        }

        let inner = &mut self.inner;
        self.unwritten.retain(|tx_id| match inner.record(tx_id) {
            Ok(()) => {
                log::info!("💾 Recorded {} on retry", tx_id);
                false
            }
            Err(e) => {
                log::debug!("Ledger retry for {} failed: {}", tx_id, e);
                true
            }
        });
        self.unwritten.len()
    }
}

impl<L: DedupLedger> DedupLedger for BufferedLedger<L> {
    fn contains(&self, tx_id: &str) -> Result<bool, LedgerError> {
        if self.unwritten.contains(tx_id) {
            return Ok(true);
        }
        self.inner.contains(tx_id)
    }

    fn record(&mut self, tx_id: &str) -> Result<(), LedgerError> {
        match self.inner.record(tx_id) {
            Ok(()) => {
                self.unwritten.remove(tx_id);
                Ok(())
            }
            Err(e) => {
                self.unwritten.insert(tx_id.to_string());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Ledger whose writes fail while `writable` is false
    #[derive(Default)]
    struct FlakyLedger {
        writable: bool,
        ids: BTreeSet<String>,
    }

    impl DedupLedger for FlakyLedger {
        fn contains(&self, tx_id: &str) -> Result<bool, LedgerError> {
            Ok(self.ids.contains(tx_id))
        }

        fn record(&mut self, tx_id: &str) -> Result<(), LedgerError> {
            if !self.writable {
                return Err(LedgerError::Database("disk full".to_string()));
            }
            self.ids.insert(tx_id.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_failed_write_still_counts_as_recorded() {
        let mut ledger = BufferedLedger::new(FlakyLedger::default());

        assert!(ledger.record("0xlost").is_err());
        assert!(ledger.contains("0xlost").unwrap());
        assert!(!ledger.inner().contains("0xlost").unwrap());
        assert_eq!(ledger.unwritten(), 1);
        assert_eq!(ledger.flush(), 1);
    }

    #[test]
    fn test_flush_persists_once_writable() {
        let mut ledger = BufferedLedger::new(FlakyLedger::default());
        assert!(ledger.record("0xlate").is_err());

        ledger.inner.writable = true;
        assert_eq!(ledger.flush(), 0);

        assert!(ledger.inner().contains("0xlate").unwrap());
        assert_eq!(ledger.unwritten(), 0);
        assert!(ledger.contains("0xlate").unwrap());
    }

    #[test]
    fn test_record_then_contains() {
        let mut ledger = SqliteLedger::open_in_memory().unwrap();

        assert!(!ledger.contains("0xaaa").unwrap());
        ledger.record("0xaaa").unwrap();
        assert!(ledger.contains("0xaaa").unwrap());
        assert!(!ledger.contains("0xbbb").unwrap());
    }

    #[test]
    fn test_record_is_idempotent() {
        let mut ledger = SqliteLedger::open_in_memory().unwrap();

        ledger.record("0xdup").unwrap();
        ledger.record("0xdup").unwrap();

        assert_eq!(ledger.len().unwrap(), 1);
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("ledger.db");

        {
            let mut ledger = SqliteLedger::open(&db_path).unwrap();
            assert!(ledger.is_empty().unwrap());
            ledger.record("0xpersisted").unwrap();
        }

        let ledger = SqliteLedger::open(&db_path).unwrap();
        assert!(ledger.contains("0xpersisted").unwrap());
        assert_eq!(ledger.len().unwrap(), 1);
    }

    #[test]
    fn test_creates_parent_directory() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("state").join("ledger.db");

        let ledger = SqliteLedger::open(&db_path).unwrap();
        assert!(db_path.exists());
        assert!(ledger.is_empty().unwrap());
    }
}
