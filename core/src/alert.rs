//! Alerts and their dispatch.
//!
//! Each suspicious rule result becomes one alert referencing the rule
//! record (by name = rule id) and the transaction.

use crate::{
    clock::Clock,
    error::{TmsError, TmsResult},
    store::TmsStore,
    types::EntityId,
    verdict::RuleEvalResult,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    New,
    Acknowledged,
    Resolved,
    Dismissed,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::New          => "NEW",
            AlertStatus::Acknowledged => "ACKNOWLEDGED",
            AlertStatus::Resolved     => "RESOLVED",
            AlertStatus::Dismissed    => "DISMISSED",
        }
    }

    pub fn parse(value: &str) -> TmsResult<Self> {
        match value {
            "NEW"          => Ok(AlertStatus::New),
            "ACKNOWLEDGED" => Ok(AlertStatus::Acknowledged),
            "RESOLVED"     => Ok(AlertStatus::Resolved),
            "DISMISSED"    => Ok(AlertStatus::Dismissed),
            other => Err(TmsError::Other(anyhow::anyhow!("unknown alert status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id:             EntityId,
    pub rule_id:        EntityId,
    pub rule_name:      String,
    pub transaction_id: EntityId,
    pub status:         AlertStatus,
    pub reason:         Option<String>,
    pub created_at:     DateTime<Utc>,
}

/// Turns suspicious results into persisted alerts.
pub struct AlertDispatcher<'a> {
    store: &'a TmsStore,
    clock: &'a dyn Clock,
}

impl<'a> AlertDispatcher<'a> {
    pub fn new(store: &'a TmsStore, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    /// Create one alert for a transaction and a rule name.
    pub fn create_alert(
        &self,
        transaction_id: &str,
        rule_name: &str,
        reason: Option<&str>,
    ) -> TmsResult<Alert> {
        let rule = self.store.rule_by_name(rule_name)?;
        if self.store.get_transaction(transaction_id)?.is_none() {
            return Err(TmsError::NotFound {
                entity: "Transaction",
                key:    transaction_id.to_string(),
            });
        }

        let alert = Alert {
            id:             uuid::Uuid::new_v4().to_string(),
            rule_id:        rule.id,
            rule_name:      rule.name,
            transaction_id: transaction_id.to_string(),
            status:         AlertStatus::New,
            reason:         reason.map(str::to_string),
            created_at:     self.clock.now(),
        };
        self.store.insert_alert(&alert)?;
        Ok(alert)
    }

    /// Create an alert for every suspicious result, in result order.
    /// Stops at the first failure; alerts created before it are kept.
    pub fn dispatch(&self, transaction_id: &str, results: &[RuleEvalResult]) -> TmsResult<Vec<Alert>> {
        let mut alerts = Vec::new();
        for result in results.iter().filter(|r| r.is_suspicious) {
            let alert = self.create_alert(transaction_id, &result.rule_id, result.reason.as_deref())?;
            log::info!(
                "Alert {} raised by {} for transaction {transaction_id}",
                alert.id,
                alert.rule_name
            );
            alerts.push(alert);
        }
        Ok(alerts)
    }
}
