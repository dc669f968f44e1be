//! SQLite-backed account history.
//!
//! Counters are bumped with a single upsert returning the new value, and
//! the activity swap runs inside one SQLite transaction, so concurrent
//! evaluations sharing a database file never lose an increment.

use super::{
    daily_key, last_activity_key, velocity_key, was_dormant_key, AccountHistory, DAILY_TTL_SECS,
    LAST_ACTIVITY_TTL_SECS, VELOCITY_TTL_SECS,
};
use crate::{
    clock::{Clock, SystemClock},
    error::{TmsError, TmsResult},
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Arc;

const INCREMENT_SQL: &str = "
    INSERT INTO account_history (key, num_value, expires_at) VALUES (?1, ?2, ?3)
    ON CONFLICT(key) DO UPDATE SET
        num_value  = CASE WHEN account_history.expires_at <= ?4
                          THEN excluded.num_value
                          ELSE account_history.num_value + excluded.num_value END,
        expires_at = excluded.expires_at
    RETURNING num_value";

fn failed(op: &'static str) -> impl Fn(rusqlite::Error) -> TmsError {
    move |e| TmsError::History(format!("Failed to {op}: {e}"))
}

pub struct SqliteAccountHistory {
    conn:  Mutex<Connection>,
    clock: Arc<dyn Clock>,
}

impl SqliteAccountHistory {
    /// Open (or create) the history database at `path`.
    pub fn open(path: &str) -> TmsResult<Self> {
        Self::open_with_clock(path, Arc::new(SystemClock))
    }

    pub fn open_with_clock(path: &str, clock: Arc<dyn Clock>) -> TmsResult<Self> {
        let conn = Connection::open(path)?;
        // WAL only matters for real files; :memory: ignores it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Self::from_connection(conn, clock)
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory(clock: Arc<dyn Clock>) -> TmsResult<Self> {
        Self::from_connection(Connection::open_in_memory()?, clock)
    }

    fn from_connection(conn: Connection, clock: Arc<dyn Clock>) -> TmsResult<Self> {
        conn.execute_batch(include_str!("../../../migrations/002_account_history.sql"))?;
        Ok(Self {
            conn: Mutex::new(conn),
            clock,
        })
    }

    fn expiry(&self, ttl_secs: i64) -> (i64, i64) {
        let now = self.clock.now().timestamp_millis();
        (now, now + ttl_secs * 1000)
    }

    fn increment(&self, key: &str, by: f64, ttl_secs: i64, op: &'static str) -> TmsResult<f64> {
        let (now, expires_at) = self.expiry(ttl_secs);
        self.conn
            .lock()
            .query_row(INCREMENT_SQL, params![key, by, expires_at, now], |row| row.get(0))
            .map_err(failed(op))
    }

    fn read_number(&self, key: &str, op: &'static str) -> TmsResult<f64> {
        let now = self.clock.now().timestamp_millis();
        let value: Option<Option<f64>> = self
            .conn
            .lock()
            .query_row(
                "SELECT num_value FROM account_history WHERE key = ?1 AND expires_at > ?2",
                params![key, now],
                |row| row.get(0),
            )
            .optional()
            .map_err(failed(op))?;
        Ok(value.flatten().unwrap_or(0.0))
    }
}

#[async_trait]
impl AccountHistory for SqliteAccountHistory {
    async fn inc_daily_tx(&self, account: &str, day: NaiveDate, amount: f64) -> TmsResult<f64> {
        self.increment(
            &daily_key(account, day),
            amount,
            DAILY_TTL_SECS,
            "increment daily transaction",
        )
    }

    async fn get_daily_tx_total(&self, account: &str, day: NaiveDate) -> TmsResult<f64> {
        self.read_number(&daily_key(account, day), "get daily transaction")
    }

    async fn inc_tx_count(
        &self,
        account: &str,
        date: DateTime<Utc>,
        window_minutes: i64,
    ) -> TmsResult<i64> {
        let key = velocity_key(account, date, window_minutes)?;
        let count = self.increment(&key, 1.0, VELOCITY_TTL_SECS, "increment transaction count")?;
        Ok(count as i64)
    }

    async fn get_tx_count(
        &self,
        account: &str,
        date: DateTime<Utc>,
        window_minutes: i64,
    ) -> TmsResult<i64> {
        let key = velocity_key(account, date, window_minutes)?;
        let count = self.read_number(&key, "get transaction count")?;
        Ok(count as i64)
    }

    async fn flag_activity(
        &self,
        account: &str,
        date: DateTime<Utc>,
    ) -> TmsResult<Option<DateTime<Utc>>> {
        let key = last_activity_key(account);
        let (now, expires_at) = self.expiry(LAST_ACTIVITY_TTL_SECS);
        let op = failed("flag account activity");

        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(&op)?;
        let previous: Option<Option<String>> = tx
            .query_row(
                "SELECT text_value FROM account_history WHERE key = ?1 AND expires_at > ?2",
                params![key, now],
                |row| row.get(0),
            )
            .optional()
            .map_err(&op)?;
        tx.execute(
            "INSERT INTO account_history (key, text_value, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                 text_value = excluded.text_value,
                 expires_at = excluded.expires_at",
            params![key, date.to_rfc3339(), expires_at],
        )
        .map_err(&op)?;
        tx.commit().map_err(&op)?;

        match previous.flatten() {
            Some(text) => Ok(Some(DateTime::parse_from_rfc3339(&text)?.with_timezone(&Utc))),
            None => Ok(None),
        }
    }

    async fn set_was_dormant(&self, account: &str, ttl_secs: i64) -> TmsResult<()> {
        let (_, expires_at) = self.expiry(ttl_secs);
        self.conn
            .lock()
            .execute(
                "INSERT INTO account_history (key, num_value, expires_at) VALUES (?1, 1, ?2)
                 ON CONFLICT(key) DO UPDATE SET
                     num_value  = 1,
                     expires_at = excluded.expires_at",
                params![was_dormant_key(account), expires_at],
            )
            .map_err(failed("set dormant flag"))?;
        Ok(())
    }

    async fn get_was_dormant(&self, account: &str) -> TmsResult<bool> {
        let value = self.read_number(&was_dormant_key(account), "get dormant flag")?;
        Ok(value == 1.0)
    }

    async fn purge_expired(&self) -> TmsResult<usize> {
        let now = self.clock.now().timestamp_millis();
        let removed = self
            .conn
            .lock()
            .execute("DELETE FROM account_history WHERE expires_at <= ?1", params![now])
            .map_err(failed("purge expired entries"))?;
        if removed > 0 {
            log::debug!("Purged {removed} expired account history entries");
        }
        Ok(removed)
    }
}
