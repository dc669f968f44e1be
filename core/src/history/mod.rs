//! Per-account aggregated history.
//!
//! RULE: Rules never keep state of their own. Everything they remember
//! between transactions lives behind [`AccountHistory`], addressed by the
//! key helpers below so every implementation shares one namespace:
//!
//!   account:history:daily:<account>:<YYYY-MM-DD>     (30 days)
//!   account:history:velocity:<account>:<bucket>      (1 hour)
//!   account:history:lastactivity:<account>           (10 years)
//!   account:history:wasdormant:<account>             (caller-supplied TTL)
//!
//! TTLs are refreshed on every write and measured against the store's
//! [`Clock`](crate::clock::Clock), not the transaction date.

mod memory;
mod sqlite;

pub use memory::MemoryAccountHistory;
pub use sqlite::SqliteAccountHistory;

use crate::error::{TmsError, TmsResult};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

pub const DAILY_TTL_SECS: i64 = 60 * 60 * 24 * 30;
pub const VELOCITY_TTL_SECS: i64 = 60 * 60;
pub const LAST_ACTIVITY_TTL_SECS: i64 = 60 * 60 * 24 * 365 * 10;

const KEY_PREFIX: &str = "account:history";

/// The mutable substrate every rule reads and writes.
///
/// Increments and the activity swap must be atomic read-modify-write
/// operations: two evaluations for the same account may run at once and
/// the engine holds no locks of its own.
#[async_trait]
pub trait AccountHistory: Send + Sync {
    /// Add `amount` to the account's total for `day`. Returns the new total.
    async fn inc_daily_tx(&self, account: &str, day: NaiveDate, amount: f64) -> TmsResult<f64>;

    /// The account's total for `day`, 0 when absent or expired.
    async fn get_daily_tx_total(&self, account: &str, day: NaiveDate) -> TmsResult<f64>;

    /// Count one transaction in the fixed window containing `date`.
    /// Returns the new count for that window.
    async fn inc_tx_count(
        &self,
        account: &str,
        date: DateTime<Utc>,
        window_minutes: i64,
    ) -> TmsResult<i64>;

    async fn get_tx_count(
        &self,
        account: &str,
        date: DateTime<Utc>,
        window_minutes: i64,
    ) -> TmsResult<i64>;

    /// Record `date` as the last activity and return what was stored before.
    async fn flag_activity(
        &self,
        account: &str,
        date: DateTime<Utc>,
    ) -> TmsResult<Option<DateTime<Utc>>>;

    async fn set_was_dormant(&self, account: &str, ttl_secs: i64) -> TmsResult<()>;

    /// False once the flag's TTL has elapsed.
    async fn get_was_dormant(&self, account: &str) -> TmsResult<bool>;

    /// Evict every expired entry. Returns how many were removed.
    ///
    /// Reads already ignore expired entries; this only reclaims space.
    async fn purge_expired(&self) -> TmsResult<usize>;
}

/// Start of the fixed window containing `date`, in minutes since the epoch.
///
/// A burst straddling a boundary is split across two windows. That
/// undercount is accepted; the velocity thresholds are tuned against it.
pub fn bucket_start(date: DateTime<Utc>, window_minutes: i64) -> TmsResult<i64> {
    if window_minutes <= 0 {
        return Err(TmsError::History(format!(
            "window must be a positive number of minutes, got {window_minutes}"
        )));
    }
    let minutes_since_epoch = date.timestamp_millis().div_euclid(60_000);
    Ok(minutes_since_epoch.div_euclid(window_minutes) * window_minutes)
}

pub fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

pub fn daily_key(account: &str, day: NaiveDate) -> String {
    format!("{KEY_PREFIX}:daily:{account}:{}", format_day(day))
}

/// The key holds the window start but not its width: a 30- and a
/// 60-minute window starting on the same minute share one counter.
pub fn velocity_key(account: &str, date: DateTime<Utc>, window_minutes: i64) -> TmsResult<String> {
    let bucket = bucket_start(date, window_minutes)?;
    Ok(format!("{KEY_PREFIX}:velocity:{account}:{bucket}"))
}

pub fn last_activity_key(account: &str) -> String {
    format!("{KEY_PREFIX}:lastactivity:{account}")
}

pub fn was_dormant_key(account: &str) -> String {
    format!("{KEY_PREFIX}:wasdormant:{account}")
}
