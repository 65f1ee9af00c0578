//! SQLite PRAGMA settings for the announcement ledger
//!
//! The ledger is tiny and written at most once per cycle, so durability wins
//! over throughput: WAL journal with `synchronous=FULL` makes every committed
//! insert survive a crash or power loss.

use rusqlite::Connection;
use std::time::Duration;

/// Apply durability-first PRAGMAs to a freshly opened connection.
pub fn apply_durable_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    // journal_mode answers with the resulting mode, so read it back
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.pragma_update(None, "synchronous", "FULL")?;
    conn.busy_timeout(Duration::from_secs(5))?;

    log::debug!("📊 Applied durable SQLite pragmas (journal={}, synchronous=FULL)", mode);
    Ok(())
}
