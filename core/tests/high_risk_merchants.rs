mod common;

use common::{transfer, utc};
use tms_core::{
    history::MemoryAccountHistory,
    risk_accounts::{RiskAccounts, StaticRiskAccounts},
    rules::{HighRiskMerchants, Rule, RuleContext},
    transaction::Transaction,
    verdict::Verdict,
};

async fn evaluate(risk: &dyn RiskAccounts, txn: &Transaction) -> Verdict {
    let history = MemoryAccountHistory::new();
    let ctx = RuleContext { transaction: txn, history: &history, risk_accounts: risk };
    HighRiskMerchants.evaluate(&ctx).await.unwrap()
}

#[tokio::test]
async fn high_risk_target_is_flagged() {
    let risk = StaticRiskAccounts::builtin();
    let txn = transfer(
        "m1",
        Some("customer-1"),
        Some("merchant-gambling-001"),
        20.0,
        utc(2025, 8, 5, 9, 0),
    );
    assert_eq!(
        evaluate(&risk, &txn).await,
        Verdict::suspicious("Transaction involves high-risk merchant account (merchant-gambling-001)")
    );
}

#[tokio::test]
async fn high_risk_source_is_flagged() {
    let risk = StaticRiskAccounts::builtin();
    let txn = transfer(
        "m2",
        Some("merchant-offshore-001"),
        Some("customer-1"),
        20.0,
        utc(2025, 8, 5, 9, 0),
    );
    let verdict = evaluate(&risk, &txn).await;
    assert_eq!(
        verdict,
        Verdict::suspicious("Transaction involves high-risk merchant account (merchant-offshore-001)")
    );
}

#[tokio::test]
async fn target_is_named_when_both_sides_are_high_risk() {
    let risk = StaticRiskAccounts::builtin();
    let txn = transfer(
        "m3",
        Some("merchant-offshore-001"),
        Some("merchant-crypto-exchange-002"),
        20.0,
        utc(2025, 8, 5, 9, 0),
    );
    match evaluate(&risk, &txn).await {
        Verdict::Suspicious { reason } => {
            assert!(reason.contains("merchant-crypto-exchange-002"), "reason was: {reason}");
            assert!(!reason.contains("merchant-offshore-001"));
        }
        Verdict::Clear => panic!("both sides are high-risk"),
    }
}

#[tokio::test]
async fn ordinary_and_missing_accounts_are_clear() {
    let risk = StaticRiskAccounts::builtin();
    let at = utc(2025, 8, 5, 9, 0);

    let ordinary = transfer("m4", Some("customer-1"), Some("customer-2"), 20.0, at);
    assert_eq!(evaluate(&risk, &ordinary).await, Verdict::Clear);

    let no_accounts = transfer("m5", None, None, 20.0, at);
    assert_eq!(evaluate(&risk, &no_accounts).await, Verdict::Clear);
}

#[tokio::test]
async fn matching_is_exact() {
    let risk = StaticRiskAccounts::builtin();
    let at = utc(2025, 8, 5, 9, 0);

    let upper = transfer("m6", Some("c"), Some("MERCHANT-GAMBLING-001"), 20.0, at);
    assert_eq!(evaluate(&risk, &upper).await, Verdict::Clear);

    let prefix = transfer("m7", Some("c"), Some("merchant-gambling-0011"), 20.0, at);
    assert_eq!(evaluate(&risk, &prefix).await, Verdict::Clear);
}

#[tokio::test]
async fn custom_risk_list_replaces_builtin() {
    let risk = StaticRiskAccounts::new(["acct-watchlist-9"]);
    let at = utc(2025, 8, 5, 9, 0);

    let watched = transfer("m8", Some("c"), Some("acct-watchlist-9"), 20.0, at);
    assert!(evaluate(&risk, &watched).await.is_suspicious());

    let builtin = transfer("m9", Some("c"), Some("merchant-gambling-001"), 20.0, at);
    assert_eq!(evaluate(&risk, &builtin).await, Verdict::Clear);
}
