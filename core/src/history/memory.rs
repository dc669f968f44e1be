//! In-process account history. One lock guards all slots, so every
//! operation is a single critical section.

use super::{
    daily_key, last_activity_key, velocity_key, was_dormant_key, AccountHistory, DAILY_TTL_SECS,
    LAST_ACTIVITY_TTL_SECS, VELOCITY_TTL_SECS,
};
use crate::{
    clock::{Clock, SystemClock},
    error::TmsResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};

#[derive(Debug, Clone)]
struct Expiring<T> {
    value:      T,
    expires_at: DateTime<Utc>,
}

type Slots<T> = HashMap<String, Expiring<T>>;

fn live<'a, T>(slots: &'a Slots<T>, key: &str, now: DateTime<Utc>) -> Option<&'a T> {
    slots
        .get(key)
        .filter(|entry| entry.expires_at > now)
        .map(|entry| &entry.value)
}

fn put<T>(slots: &mut Slots<T>, key: String, value: T, now: DateTime<Utc>, ttl_secs: i64) {
    let expires_at = now + Duration::seconds(ttl_secs);
    slots.insert(key, Expiring { value, expires_at });
}

fn sweep<T>(slots: &mut Slots<T>, now: DateTime<Utc>) -> usize {
    let before = slots.len();
    slots.retain(|_, entry| entry.expires_at > now);
    before - slots.len()
}

#[derive(Debug, Default)]
struct State {
    amounts:  Slots<f64>,
    counts:   Slots<i64>,
    activity: Slots<DateTime<Utc>>,
    flags:    Slots<()>,
}

pub struct MemoryAccountHistory {
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
}

impl Default for MemoryAccountHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAccountHistory {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(State::default()),
        }
    }

    // ── Test seeding ───────────────────────────────────────────

    pub fn set_daily_tx_total(&self, account: &str, day: NaiveDate, amount: f64) {
        let now = self.clock.now();
        put(&mut self.state.lock().amounts, daily_key(account, day), amount, now, DAILY_TTL_SECS);
    }

    pub fn set_tx_count(
        &self,
        account: &str,
        date: DateTime<Utc>,
        window_minutes: i64,
        count: i64,
    ) -> TmsResult<()> {
        let key = velocity_key(account, date, window_minutes)?;
        let now = self.clock.now();
        put(&mut self.state.lock().counts, key, count, now, VELOCITY_TTL_SECS);
        Ok(())
    }

    pub fn set_last_activity(&self, account: &str, date: DateTime<Utc>) {
        let now = self.clock.now();
        put(
            &mut self.state.lock().activity,
            last_activity_key(account),
            date,
            now,
            LAST_ACTIVITY_TTL_SECS,
        );
    }

    pub fn last_activity(&self, account: &str) -> Option<DateTime<Utc>> {
        let now = self.clock.now();
        live(&self.state.lock().activity, &last_activity_key(account), now).copied()
    }

    pub fn clear_was_dormant(&self, account: &str) {
        self.state.lock().flags.remove(&was_dormant_key(account));
    }
}

#[async_trait]
impl AccountHistory for MemoryAccountHistory {
    async fn inc_daily_tx(&self, account: &str, day: NaiveDate, amount: f64) -> TmsResult<f64> {
        let key = daily_key(account, day);
        let now = self.clock.now();
        let mut state = self.state.lock();
        let total = live(&state.amounts, &key, now).copied().unwrap_or(0.0) + amount;
        put(&mut state.amounts, key, total, now, DAILY_TTL_SECS);
        Ok(total)
    }

    async fn get_daily_tx_total(&self, account: &str, day: NaiveDate) -> TmsResult<f64> {
        let now = self.clock.now();
        let state = self.state.lock();
        Ok(live(&state.amounts, &daily_key(account, day), now).copied().unwrap_or(0.0))
    }

    async fn inc_tx_count(
        &self,
        account: &str,
        date: DateTime<Utc>,
        window_minutes: i64,
    ) -> TmsResult<i64> {
        let key = velocity_key(account, date, window_minutes)?;
        let now = self.clock.now();
        let mut state = self.state.lock();
        let count = live(&state.counts, &key, now).copied().unwrap_or(0) + 1;
        put(&mut state.counts, key, count, now, VELOCITY_TTL_SECS);
        Ok(count)
    }

    async fn get_tx_count(
        &self,
        account: &str,
        date: DateTime<Utc>,
        window_minutes: i64,
    ) -> TmsResult<i64> {
        let key = velocity_key(account, date, window_minutes)?;
        let now = self.clock.now();
        let state = self.state.lock();
        Ok(live(&state.counts, &key, now).copied().unwrap_or(0))
    }

    async fn flag_activity(
        &self,
        account: &str,
        date: DateTime<Utc>,
    ) -> TmsResult<Option<DateTime<Utc>>> {
        let key = last_activity_key(account);
        let now = self.clock.now();
        let mut state = self.state.lock();
        let previous = live(&state.activity, &key, now).copied();
        put(&mut state.activity, key, date, now, LAST_ACTIVITY_TTL_SECS);
        Ok(previous)
    }

    async fn set_was_dormant(&self, account: &str, ttl_secs: i64) -> TmsResult<()> {
        let now = self.clock.now();
        put(&mut self.state.lock().flags, was_dormant_key(account), (), now, ttl_secs);
        Ok(())
    }

    async fn get_was_dormant(&self, account: &str) -> TmsResult<bool> {
        let now = self.clock.now();
        Ok(live(&self.state.lock().flags, &was_dormant_key(account), now).is_some())
    }

    async fn purge_expired(&self) -> TmsResult<usize> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let removed = sweep(&mut state.amounts, now)
            + sweep(&mut state.counts, now)
            + sweep(&mut state.activity, now)
            + sweep(&mut state.flags, now);
        if removed > 0 {
            log::debug!("Purged {removed} expired account history entries");
        }
        Ok(removed)
    }
}
