//! Persisted set of comment ids the bot has already acted on.
//!
//! # Table design
//!
//! A single `processed` table with one text column:
//! ```text
//! processed(id TEXT)
//! ```
//!
//! The layout matches databases written by earlier releases of the bot, so
//! an existing `jpegbot.db` keeps its history. Lookup-and-insert happens in one
//! transaction; the scan loop is the only writer.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{BotError, Result};

/// Check-and-mark contract for processed comment ids.
pub trait DedupStore {
    /// Returns `true` if `id` was seen before. An unseen id is recorded and
    /// `false` is returned, so a later call for the same id returns `true`.
    fn has_been_processed(&mut self, id: &str) -> Result<bool>;
}

fn unavailable(e: rusqlite::Error) -> BotError {
    BotError::StorageUnavailable(e.to_string())
}

// ---------------------------------------------------------------------------
// SqliteDedupStore
// ---------------------------------------------------------------------------

pub struct SqliteDedupStore {
    conn: Connection,
}

impl SqliteDedupStore {
    /// Open or create the database at `path`.
    ///
    /// Creates the `processed` table if it doesn't already exist.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(unavailable)?;
        Self::init(conn)
    }

    /// A store that lives only as long as the process.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(unavailable)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute("CREATE TABLE IF NOT EXISTS processed (id TEXT)", [])
            .map_err(unavailable)?;
        Ok(Self { conn })
    }

    /// Whether `id` is recorded, without recording it.
    pub fn contains(&self, id: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM processed WHERE id = ?1 LIMIT 1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(unavailable)?;
        Ok(found.is_some())
    }

    /// Number of recorded ids.
    pub fn count(&self) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM processed", [], |row| row.get(0))
            .map_err(unavailable)?;
        Ok(n.max(0) as u64)
    }
}

impl DedupStore for SqliteDedupStore {
    fn has_been_processed(&mut self, id: &str) -> Result<bool> {
        let tx = self.conn.transaction().map_err(unavailable)?;
        let seen: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM processed WHERE id = ?1 LIMIT 1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(unavailable)?;
        if seen.is_some() {
            return Ok(true);
        }
        tx.execute("INSERT INTO processed (id) VALUES (?1)", params![id])
            .map_err(unavailable)?;
        tx.commit().map_err(unavailable)?;
        Ok(false)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
