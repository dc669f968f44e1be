//! Rule trait and the fixed set of built-in rules.
//!
//! RULE: The rule set is closed. New detection logic is a new
//! `BuiltinRule` variant, never runtime registration.
//! Each rule writes only to its own history keys (daily, velocity,
//! lastactivity, wasdormant); reading another rule's keys is allowed.

mod dormant_account_activity;
mod high_risk_merchants;
mod high_velocity_transactions;
mod suspicious_activity;

pub use dormant_account_activity::{DormantAccountActivity, DORMANT_ACCOUNT_ACTIVITY_RULE_ID};
pub use high_risk_merchants::{HighRiskMerchants, HIGH_RISK_MERCHANTS_RULE_ID};
pub use high_velocity_transactions::{
    HighVelocityTransactions, HIGH_VELOCITY_TRANSACTIONS_RULE_ID,
};
pub use suspicious_activity::{SuspiciousActivity, SUSPICIOUS_ACTIVITY_RULE_ID};

use crate::{
    config::RuleThresholds,
    error::TmsResult,
    history::AccountHistory,
    risk_accounts::RiskAccounts,
    transaction::Transaction,
    types::RuleId,
    verdict::Verdict,
};
use async_trait::async_trait;

/// Everything a rule may look at for one evaluation.
pub struct RuleContext<'a> {
    pub transaction:   &'a Transaction,
    pub history:       &'a dyn AccountHistory,
    pub risk_accounts: &'a dyn RiskAccounts,
}

impl<'a> RuleContext<'a> {
    /// The account history is attributed to, if the transaction names one.
    pub fn source_account(&self) -> Option<&'a str> {
        self.transaction
            .source_account_key
            .as_deref()
            .filter(|key| !key.is_empty())
    }
}

/// The contract every detection rule fulfills.
#[async_trait]
pub trait Rule: Send + Sync {
    /// Stable id. Also the name of the persisted rule record.
    fn id(&self) -> RuleId;

    /// Judge one transaction.
    ///
    /// NOT pure: a rule may update account history as part of judging
    /// (bumping a counter is itself the signal). Evaluating the same
    /// transaction twice counts it twice; callers evaluate at most once.
    async fn evaluate(&self, ctx: &RuleContext<'_>) -> TmsResult<Verdict>;
}

pub enum BuiltinRule {
    SuspiciousActivity(SuspiciousActivity),
    HighVelocityTransactions(HighVelocityTransactions),
    HighRiskMerchants(HighRiskMerchants),
    DormantAccountActivity(DormantAccountActivity),
}

impl BuiltinRule {
    /// Ids of the built-in rules, in evaluation order.
    pub const IDS: [RuleId; 4] = [
        SUSPICIOUS_ACTIVITY_RULE_ID,
        HIGH_VELOCITY_TRANSACTIONS_RULE_ID,
        HIGH_RISK_MERCHANTS_RULE_ID,
        DORMANT_ACCOUNT_ACTIVITY_RULE_ID,
    ];

    /// All built-in rules in evaluation order. Must match `IDS`.
    pub fn all(thresholds: &RuleThresholds) -> Vec<BuiltinRule> {
        vec![
            BuiltinRule::SuspiciousActivity(SuspiciousActivity::new(thresholds)),
            BuiltinRule::HighVelocityTransactions(HighVelocityTransactions::new(thresholds)),
            BuiltinRule::HighRiskMerchants(HighRiskMerchants),
            BuiltinRule::DormantAccountActivity(DormantAccountActivity::new(thresholds)),
        ]
    }
}

#[async_trait]
impl Rule for BuiltinRule {
    fn id(&self) -> RuleId {
        match self {
            BuiltinRule::SuspiciousActivity(rule)       => rule.id(),
            BuiltinRule::HighVelocityTransactions(rule) => rule.id(),
            BuiltinRule::HighRiskMerchants(rule)        => rule.id(),
            BuiltinRule::DormantAccountActivity(rule)   => rule.id(),
        }
    }

    async fn evaluate(&self, ctx: &RuleContext<'_>) -> TmsResult<Verdict> {
        match self {
            BuiltinRule::SuspiciousActivity(rule)       => rule.evaluate(ctx).await,
            BuiltinRule::HighVelocityTransactions(rule) => rule.evaluate(ctx).await,
            BuiltinRule::HighRiskMerchants(rule)        => rule.evaluate(ctx).await,
            BuiltinRule::DormantAccountActivity(rule)   => rule.evaluate(ctx).await,
        }
    }
}
