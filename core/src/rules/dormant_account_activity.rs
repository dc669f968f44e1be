use super::{Rule, RuleContext};
use crate::{config::RuleThresholds, error::TmsResult, types::RuleId, verdict::Verdict};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub const DORMANT_ACCOUNT_ACTIVITY_RULE_ID: RuleId = "dormant_account_activity";

const MILLIS_PER_DAY: f64 = 24.0 * 60.0 * 60.0 * 1000.0;

/// Whole days between two instants, rounded to the nearest day.
pub(crate) fn days_between(a: DateTime<Utc>, b: DateTime<Utc>) -> i64 {
    let millis = (a - b).num_milliseconds().abs() as f64;
    (millis / MILLIS_PER_DAY).round() as i64
}

/// Flags spending on an account that just came back from dormancy.
///
/// States per account:
///   Active         - neither condition below holds (nothing stored)
///   Dormant        - this transaction ends a gap of >= dormancy_days
///   FlaggedDormant - gap is short, but the wasdormant flag is still live
///
/// In either dormant state, the day's total (written by the
/// suspicious_activity rule) at or above `daily_total_threshold` is
/// suspicious. The comparison is on amount, not transaction count.
#[derive(Debug, Clone)]
pub struct DormantAccountActivity {
    dormancy_days:         i64,
    daily_total_threshold: f64,
    flag_ttl_secs:         i64,
}

impl DormantAccountActivity {
    pub fn new(thresholds: &RuleThresholds) -> Self {
        Self {
            dormancy_days:         thresholds.dormancy_threshold_days,
            daily_total_threshold: thresholds.dormant_daily_total_threshold,
            flag_ttl_secs:         thresholds.dormant_flag_ttl_secs,
        }
    }
}

impl Default for DormantAccountActivity {
    fn default() -> Self {
        Self::new(&RuleThresholds::default())
    }
}

#[async_trait]
impl Rule for DormantAccountActivity {
    fn id(&self) -> RuleId {
        DORMANT_ACCOUNT_ACTIVITY_RULE_ID
    }

    async fn evaluate(&self, ctx: &RuleContext<'_>) -> TmsResult<Verdict> {
        let Some(account) = ctx.source_account() else {
            log::debug!("{}: no source account, skipping", self.id());
            return Ok(Verdict::Clear);
        };
        let date = ctx.transaction.date;

        let previous = ctx.history.flag_activity(account, date).await?;
        let days_since_last_activity = previous
            .map(|prev| days_between(date, prev))
            .unwrap_or(0);

        let dormant = if days_since_last_activity >= self.dormancy_days {
            ctx.history.set_was_dormant(account, self.flag_ttl_secs).await?;
            log::info!(
                "Account {account} reactivated after {days_since_last_activity} days of inactivity"
            );
            true
        } else {
            ctx.history.get_was_dormant(account).await?
        };

        if !dormant {
            return Ok(Verdict::Clear);
        }

        let daily_total = ctx
            .history
            .get_daily_tx_total(account, ctx.transaction.day())
            .await?;
        if daily_total >= self.daily_total_threshold {
            return Ok(Verdict::suspicious(format!(
                "Dormant account with high activity: {daily_total} transactions in a day after {days_since_last_activity} days of inactivity"
            )));
        }
        Ok(Verdict::Clear)
    }
}
