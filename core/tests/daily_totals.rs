//! Suspicious activity: cumulative daily totals per source account.

mod common;

use common::{from_account, transfer, utc};
use tms_core::{
    evaluator::eval_rules,
    history::{AccountHistory, MemoryAccountHistory},
    risk_accounts::StaticRiskAccounts,
    rules::{Rule, RuleContext, SuspiciousActivity, SUSPICIOUS_ACTIVITY_RULE_ID},
    verdict::Verdict,
};

async fn evaluate(
    history: &MemoryAccountHistory,
    txn: &tms_core::transaction::Transaction,
) -> Verdict {
    let risk = StaticRiskAccounts::default();
    let ctx = RuleContext { transaction: txn, history, risk_accounts: &risk };
    SuspiciousActivity::default().evaluate(&ctx).await.unwrap()
}

/// Scenario A: 3000 -> 7000 -> 11000. Only the third crosses the line.
#[tokio::test]
async fn third_same_day_transaction_crosses_threshold() {
    let history = MemoryAccountHistory::new();
    let risk = StaticRiskAccounts::builtin();
    let day = utc(2025, 8, 5, 9, 0);

    let amounts = [3000.0, 4000.0, 4000.0];
    let mut verdicts = Vec::new();
    for (i, amount) in amounts.iter().enumerate() {
        let txn = from_account(&format!("a-{i}"), "S", *amount, day);
        let results = eval_rules(&txn, &history, &risk).await;
        assert_eq!(results[0].rule_id, SUSPICIOUS_ACTIVITY_RULE_ID);
        verdicts.push(results[0].clone());
    }

    assert!(!verdicts[0].is_suspicious, "3000 should pass");
    assert!(!verdicts[1].is_suspicious, "7000 should pass");
    assert!(verdicts[2].is_suspicious, "11000 should be flagged");
    let reason = verdicts[2].reason.as_deref().unwrap();
    assert!(reason.contains("11000"), "reason was: {reason}");
    assert_eq!(
        reason,
        "Daily total (11000) for account S on 2025-08-05 exceeds threshold of 10000"
    );
}

#[tokio::test]
async fn total_exactly_at_threshold_is_not_suspicious() {
    let history = MemoryAccountHistory::new();
    let at = utc(2025, 8, 5, 9, 0);

    assert_eq!(evaluate(&history, &from_account("t1", "S", 6000.0, at)).await, Verdict::Clear);
    assert_eq!(evaluate(&history, &from_account("t2", "S", 4000.0, at)).await, Verdict::Clear);

    let verdict = evaluate(&history, &from_account("t3", "S", 0.5, at)).await;
    match verdict {
        Verdict::Suspicious { reason } => assert!(reason.contains("10000.5"), "reason was: {reason}"),
        Verdict::Clear => panic!("10000.5 is above the threshold"),
    }
}

#[tokio::test]
async fn single_large_transaction_is_flagged() {
    let history = MemoryAccountHistory::new();
    let verdict = evaluate(&history, &from_account("big", "S", 15000.0, utc(2025, 8, 5, 9, 0))).await;
    assert!(verdict.is_suspicious());
}

#[tokio::test]
async fn totals_do_not_carry_across_days_or_accounts() {
    let history = MemoryAccountHistory::new();

    evaluate(&history, &from_account("d1", "S", 9000.0, utc(2025, 8, 5, 23, 59))).await;
    // Next UTC day starts from zero.
    let next_day = evaluate(&history, &from_account("d2", "S", 9000.0, utc(2025, 8, 6, 0, 1))).await;
    assert_eq!(next_day, Verdict::Clear);

    // Another account on the same day starts from zero too.
    let other = evaluate(&history, &from_account("d3", "T", 9000.0, utc(2025, 8, 5, 12, 0))).await;
    assert_eq!(other, Verdict::Clear);

    let total = history
        .get_daily_tx_total("S", utc(2025, 8, 5, 0, 0).date_naive())
        .await
        .unwrap();
    assert_eq!(total, 9000.0);
}

#[tokio::test]
async fn missing_source_account_leaves_history_untouched() {
    let history = MemoryAccountHistory::new();
    let at = utc(2025, 8, 5, 9, 0);
    let txn = transfer("no-source", None, Some("merchant-x"), 50_000.0, at);

    assert_eq!(evaluate(&history, &txn).await, Verdict::Clear);
    assert_eq!(history.get_daily_tx_total("", at.date_naive()).await.unwrap(), 0.0);
}
