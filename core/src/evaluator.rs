//! Rule evaluation orchestrator.
//!
//! RULES:
//!   - Every rule is attempted exactly once per call. No retries.
//!   - All rules of one call run concurrently on the caller's task.
//!   - A failing rule (error or panic) never aborts its siblings; it is
//!     reported as a suspicious result carrying the failure message.
//!   - Results come back in rule order, whatever order they finish in.

use crate::{
    config::RuleThresholds,
    error::TmsResult,
    history::AccountHistory,
    risk_accounts::RiskAccounts,
    rules::{BuiltinRule, Rule, RuleContext},
    transaction::Transaction,
    types::RuleId,
    verdict::{RuleEvalResult, Verdict},
};
use async_trait::async_trait;
use futures::{future::join_all, FutureExt};
use std::{any::Any, panic::AssertUnwindSafe};

#[async_trait]
impl<R: Rule + ?Sized> Rule for Box<R> {
    fn id(&self) -> RuleId {
        (**self).id()
    }

    async fn evaluate(&self, ctx: &RuleContext<'_>) -> TmsResult<Verdict> {
        (**self).evaluate(ctx).await
    }
}

/// The built-in rules, configured once and evaluated per transaction.
pub struct RuleEngine {
    rules: Vec<BuiltinRule>,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(&RuleThresholds::default())
    }
}

impl RuleEngine {
    pub fn new(thresholds: &RuleThresholds) -> Self {
        Self { rules: BuiltinRule::all(thresholds) }
    }

    pub fn rule_ids(&self) -> Vec<RuleId> {
        self.rules.iter().map(|rule| rule.id()).collect()
    }

    pub async fn eval_rules(
        &self,
        transaction: &Transaction,
        history: &dyn AccountHistory,
        risk_accounts: &dyn RiskAccounts,
    ) -> Vec<RuleEvalResult> {
        eval_rules_with(&self.rules, transaction, history, risk_accounts).await
    }
}

/// Evaluate the built-in rules with default thresholds.
pub async fn eval_rules(
    transaction: &Transaction,
    history: &dyn AccountHistory,
    risk_accounts: &dyn RiskAccounts,
) -> Vec<RuleEvalResult> {
    RuleEngine::default()
        .eval_rules(transaction, history, risk_accounts)
        .await
}

/// Evaluate `rules` against one transaction. One result per rule, in order.
pub async fn eval_rules_with<R: Rule>(
    rules: &[R],
    transaction: &Transaction,
    history: &dyn AccountHistory,
    risk_accounts: &dyn RiskAccounts,
) -> Vec<RuleEvalResult> {
    let ctx = RuleContext { transaction, history, risk_accounts };
    let results = join_all(rules.iter().map(|rule| evaluate_isolated(rule, &ctx))).await;

    let flagged = results.iter().filter(|r| r.is_suspicious).count();
    log::debug!(
        "Evaluated {} rules for transaction {}: {flagged} suspicious",
        results.len(),
        transaction.external_id
    );
    results
}

async fn evaluate_isolated<R: Rule + ?Sized>(rule: &R, ctx: &RuleContext<'_>) -> RuleEvalResult {
    let rule_id = rule.id();
    let outcome = AssertUnwindSafe(rule.evaluate(ctx)).catch_unwind().await;

    match outcome {
        Ok(Ok(verdict)) => {
            if let Verdict::Suspicious { reason } = &verdict {
                log::warn!(
                    "Rule {rule_id} flagged transaction {}: {reason}",
                    ctx.transaction.external_id
                );
            }
            RuleEvalResult::new(rule_id, verdict)
        }
        Ok(Err(e)) => {
            log::error!(
                "Rule {rule_id} failed on transaction {}: {e}",
                ctx.transaction.external_id
            );
            RuleEvalResult::rule_failed(rule_id, &e.to_string())
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            log::error!(
                "Rule {rule_id} panicked on transaction {}: {message}",
                ctx.transaction.external_id
            );
            RuleEvalResult::rule_failed(rule_id, &message)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "rule panicked".to_string()
    }
}
