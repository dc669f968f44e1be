use super::{Rule, RuleContext};
use crate::{
    config::RuleThresholds,
    error::TmsResult,
    history::format_day,
    types::RuleId,
    verdict::Verdict,
};
use async_trait::async_trait;

pub const SUSPICIOUS_ACTIVITY_RULE_ID: RuleId = "suspicious_activity";

/// Flags an account whose cumulative amount for the day, this transaction
/// included, goes above the threshold.
#[derive(Debug, Clone)]
pub struct SuspiciousActivity {
    threshold: f64,
}

impl SuspiciousActivity {
    pub fn new(thresholds: &RuleThresholds) -> Self {
        Self { threshold: thresholds.daily_total_threshold }
    }
}

impl Default for SuspiciousActivity {
    fn default() -> Self {
        Self::new(&RuleThresholds::default())
    }
}

#[async_trait]
impl Rule for SuspiciousActivity {
    fn id(&self) -> RuleId {
        SUSPICIOUS_ACTIVITY_RULE_ID
    }

    async fn evaluate(&self, ctx: &RuleContext<'_>) -> TmsResult<Verdict> {
        let Some(account) = ctx.source_account() else {
            log::debug!("{}: no source account, skipping", self.id());
            return Ok(Verdict::Clear);
        };

        let day = ctx.transaction.day();
        let total = ctx
            .history
            .inc_daily_tx(account, day, ctx.transaction.amount)
            .await?;

        if total > self.threshold {
            return Ok(Verdict::suspicious(format!(
                "Daily total ({total}) for account {account} on {} exceeds threshold of {}",
                format_day(day),
                self.threshold
            )));
        }
        Ok(Verdict::Clear)
    }
}
