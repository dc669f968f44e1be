use super::{Rule, RuleContext};
use crate::{config::RuleThresholds, error::TmsResult, types::RuleId, verdict::Verdict};
use async_trait::async_trait;

pub const HIGH_VELOCITY_TRANSACTIONS_RULE_ID: RuleId = "high_velocity_transactions";

/// Flags the transaction that takes an account over `max_count`
/// transactions within one fixed window.
#[derive(Debug, Clone)]
pub struct HighVelocityTransactions {
    window_minutes: i64,
    max_count:      i64,
}

impl HighVelocityTransactions {
    pub fn new(thresholds: &RuleThresholds) -> Self {
        Self {
            window_minutes: thresholds.velocity_window_minutes,
            max_count:      thresholds.velocity_count_threshold,
        }
    }
}

impl Default for HighVelocityTransactions {
    fn default() -> Self {
        Self::new(&RuleThresholds::default())
    }
}

#[async_trait]
impl Rule for HighVelocityTransactions {
    fn id(&self) -> RuleId {
        HIGH_VELOCITY_TRANSACTIONS_RULE_ID
    }

    async fn evaluate(&self, ctx: &RuleContext<'_>) -> TmsResult<Verdict> {
        let Some(account) = ctx.source_account() else {
            log::debug!("{}: no source account, skipping", self.id());
            return Ok(Verdict::Clear);
        };

        let count = ctx
            .history
            .inc_tx_count(account, ctx.transaction.date, self.window_minutes)
            .await?;

        // Strict: the (max_count + 1)th transaction is the first one flagged.
        if count > self.max_count {
            return Ok(Verdict::suspicious(format!(
                "High velocity detected: {count} transactions in the last {} minutes",
                self.window_minutes
            )));
        }
        Ok(Verdict::Clear)
    }
}
