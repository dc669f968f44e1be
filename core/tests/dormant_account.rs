//! Dormant account activity: reactivation after a long gap, with the
//! wasdormant flag carrying the state for `dormant_flag_ttl_secs`.

mod common;

use chrono::Duration;
use common::{from_account, utc};
use std::sync::Arc;
use tms_core::{
    clock::ManualClock,
    history::{AccountHistory, MemoryAccountHistory},
    risk_accounts::StaticRiskAccounts,
    rules::{DormantAccountActivity, Rule, RuleContext},
    transaction::Transaction,
    verdict::Verdict,
};

async fn evaluate(history: &MemoryAccountHistory, txn: &Transaction) -> Verdict {
    let risk = StaticRiskAccounts::default();
    let ctx = RuleContext { transaction: txn, history, risk_accounts: &risk };
    DormantAccountActivity::default().evaluate(&ctx).await.unwrap()
}

/// Scenario C: last seen 100 days ago, nothing spent today yet.
#[tokio::test]
async fn reactivation_sets_flag_without_flagging_first_transaction() {
    let history = MemoryAccountHistory::new();
    let now = utc(2025, 8, 5, 10, 0);
    history.set_last_activity("D", now - Duration::days(100));

    let verdict = evaluate(&history, &from_account("c1", "D", 100.0, now)).await;

    assert_eq!(verdict, Verdict::Clear);
    assert!(history.get_was_dormant("D").await.unwrap());
    assert_eq!(history.last_activity("D"), Some(now));
}

#[tokio::test]
async fn flagged_account_with_daily_total_is_suspicious() {
    let history = MemoryAccountHistory::new();
    let now = utc(2025, 8, 5, 10, 0);
    history.set_last_activity("D", now - Duration::days(100));
    evaluate(&history, &from_account("c1", "D", 100.0, now)).await;

    // Same day, flag still live, total written by the daily-total rule.
    history.set_daily_tx_total("D", now.date_naive(), 6.0);
    let later = now + Duration::minutes(5);
    let verdict = evaluate(&history, &from_account("c2", "D", 1.0, later)).await;

    assert_eq!(
        verdict,
        Verdict::suspicious(
            "Dormant account with high activity: 6 transactions in a day after 0 days of inactivity"
        )
    );
}

#[tokio::test]
async fn reactivating_transaction_with_existing_total_is_suspicious() {
    let history = MemoryAccountHistory::new();
    let now = utc(2025, 8, 5, 10, 0);
    history.set_last_activity("D", now - Duration::days(120));
    history.set_daily_tx_total("D", now.date_naive(), 5.0);

    let verdict = evaluate(&history, &from_account("r1", "D", 5.0, now)).await;
    match verdict {
        Verdict::Suspicious { reason } => {
            assert!(reason.contains("after 120 days"), "reason was: {reason}")
        }
        Verdict::Clear => panic!("total at threshold on a reactivated account"),
    }
}

#[tokio::test]
async fn first_ever_transaction_is_not_dormant() {
    let history = MemoryAccountHistory::new();
    let now = utc(2025, 8, 5, 10, 0);
    history.set_daily_tx_total("N", now.date_naive(), 500.0);

    let verdict = evaluate(&history, &from_account("n1", "N", 500.0, now)).await;

    assert_eq!(verdict, Verdict::Clear);
    assert!(!history.get_was_dormant("N").await.unwrap());
    assert_eq!(history.last_activity("N"), Some(now));
}

#[tokio::test]
async fn short_gap_is_not_dormant() {
    let history = MemoryAccountHistory::new();
    let now = utc(2025, 8, 5, 10, 0);
    history.set_last_activity("A", now - Duration::days(89));
    history.set_daily_tx_total("A", now.date_naive(), 9000.0);

    let verdict = evaluate(&history, &from_account("a1", "A", 10.0, now)).await;
    assert_eq!(verdict, Verdict::Clear);
    assert!(!history.get_was_dormant("A").await.unwrap());
}

#[tokio::test]
async fn gap_rounds_to_nearest_day() {
    let history = MemoryAccountHistory::new();
    let now = utc(2025, 8, 5, 10, 0);
    // 89.5 days rounds up to 90.
    history.set_last_activity("R", now - Duration::days(89) - Duration::hours(12));

    evaluate(&history, &from_account("r1", "R", 1.0, now)).await;
    assert!(history.get_was_dormant("R").await.unwrap());
}

#[tokio::test]
async fn flag_expires_after_ttl() {
    let start = utc(2025, 8, 5, 10, 0);
    let clock = Arc::new(ManualClock::new(start));
    let history = MemoryAccountHistory::with_clock(clock.clone());
    history.set_last_activity("D", start - Duration::days(100));

    evaluate(&history, &from_account("e1", "D", 1.0, start)).await;
    assert!(history.get_was_dormant("D").await.unwrap());

    clock.advance(Duration::hours(23));
    assert!(history.get_was_dormant("D").await.unwrap());

    clock.advance(Duration::hours(2));
    assert!(!history.get_was_dormant("D").await.unwrap());

    // Flag gone, gap short: a big day no longer counts as dormant activity.
    let later = start + Duration::hours(25);
    history.set_daily_tx_total("D", later.date_naive(), 50.0);
    let verdict = evaluate(&history, &from_account("e2", "D", 50.0, later)).await;
    assert_eq!(verdict, Verdict::Clear);
}

#[tokio::test]
async fn cleared_flag_returns_account_to_active() {
    let history = MemoryAccountHistory::new();
    let now = utc(2025, 8, 5, 10, 0);
    history.set_last_activity("D", now - Duration::days(100));
    evaluate(&history, &from_account("x1", "D", 1.0, now)).await;

    history.clear_was_dormant("D");
    history.set_daily_tx_total("D", now.date_naive(), 100.0);
    let verdict = evaluate(&history, &from_account("x2", "D", 1.0, now)).await;
    assert_eq!(verdict, Verdict::Clear);
}
