//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use tms_core::transaction::{NewTransaction, Transaction, TransactionType};

/// Route `log` output through the test harness. Safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
}

pub fn transfer(
    external_id: &str,
    source: Option<&str>,
    target: Option<&str>,
    amount: f64,
    date: DateTime<Utc>,
) -> Transaction {
    Transaction {
        id:                 format!("id-{external_id}"),
        external_id:        external_id.to_string(),
        date,
        source_account_key: source.map(str::to_string),
        target_account_key: target.map(str::to_string),
        amount,
        currency:           "USD".to_string(),
        txn_type:           TransactionType::Transfer,
        metadata:           None,
        processed_at:       None,
    }
}

/// A transfer from `source` to an ordinary (not high-risk) account.
pub fn from_account(external_id: &str, source: &str, amount: f64, date: DateTime<Utc>) -> Transaction {
    transfer(external_id, Some(source), Some("regular-account-001"), amount, date)
}

pub fn new_transaction(
    external_id: &str,
    source: &str,
    target: &str,
    amount: f64,
    date: DateTime<Utc>,
) -> NewTransaction {
    NewTransaction {
        external_id:        external_id.to_string(),
        date,
        source_account_key: Some(source.to_string()),
        target_account_key: Some(target.to_string()),
        amount,
        currency:           "EUR".to_string(),
        txn_type:           TransactionType::Debit,
        metadata:           None,
    }
}
