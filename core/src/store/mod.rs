//! SQLite persistence of transactions, rule records and alerts.
//!
//! RULE: Only the store talks to the database.
//! The monitor and the alert dispatcher call store methods; they never
//! execute SQL directly. Account history has its own store in `history`.

mod alert;
mod rule;
mod transaction;

pub use rule::RuleRecord;

use crate::error::TmsResult;
use rusqlite::Connection;

pub struct TmsStore {
    conn: Connection,
}

impl TmsStore {
    pub fn open(path: &str) -> TmsResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // In-memory URIs reject WAL; keep the default journal there.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> TmsResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order. Safe to run twice.
    pub fn migrate(&self) -> TmsResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        Ok(())
    }
}
