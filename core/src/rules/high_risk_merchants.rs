use super::{Rule, RuleContext};
use crate::{error::TmsResult, types::RuleId, verdict::Verdict};
use async_trait::async_trait;

pub const HIGH_RISK_MERCHANTS_RULE_ID: RuleId = "high_risk_merchants";

/// Flags transactions touching a high-risk account. Reads nothing from
/// history and writes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighRiskMerchants;

#[async_trait]
impl Rule for HighRiskMerchants {
    fn id(&self) -> RuleId {
        HIGH_RISK_MERCHANTS_RULE_ID
    }

    async fn evaluate(&self, ctx: &RuleContext<'_>) -> TmsResult<Verdict> {
        let tx = ctx.transaction;
        // Target first: when both sides are high-risk the reason names the target.
        let flagged = [&tx.target_account_key, &tx.source_account_key]
            .into_iter()
            .flatten()
            .find(|account| ctx.risk_accounts.is_match(account));

        Ok(match flagged {
            Some(account) => Verdict::suspicious(format!(
                "Transaction involves high-risk merchant account ({account})"
            )),
            None => Verdict::Clear,
        })
    }
}
