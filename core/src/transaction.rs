//! Transactions as seen by the engine and by the ingestion path.

use crate::{
    error::{TmsError, TmsResult},
    types::{AccountKey, EntityId},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Credit,
    Debit,
    Transfer,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Credit   => "CREDIT",
            TransactionType::Debit    => "DEBIT",
            TransactionType::Transfer => "TRANSFER",
        }
    }

    pub fn parse(value: &str) -> TmsResult<Self> {
        match value {
            "CREDIT"   => Ok(TransactionType::Credit),
            "DEBIT"    => Ok(TransactionType::Debit),
            "TRANSFER" => Ok(TransactionType::Transfer),
            other => Err(TmsError::InvalidTransaction(format!(
                "unknown transaction type '{other}'"
            ))),
        }
    }
}

/// A transaction submitted by the customer system, before it is recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub external_id:        String,
    pub date:               DateTime<Utc>,
    #[serde(default)]
    pub source_account_key: Option<AccountKey>,
    #[serde(default)]
    pub target_account_key: Option<AccountKey>,
    pub amount:             f64,
    pub currency:           String,
    #[serde(rename = "type")]
    pub txn_type:           TransactionType,
    #[serde(default)]
    pub metadata:           Option<serde_json::Value>,
}

impl NewTransaction {
    /// Reject inputs the engine is allowed to assume never happen.
    pub fn validate(&self) -> TmsResult<()> {
        if self.external_id.trim().is_empty() {
            return Err(TmsError::InvalidTransaction("externalId must not be empty".into()));
        }
        if self.currency.trim().is_empty() {
            return Err(TmsError::InvalidTransaction("currency must not be empty".into()));
        }
        if !(self.amount.is_finite() && self.amount > 0.0) {
            return Err(TmsError::InvalidTransaction(format!(
                "amount must be positive, got {}",
                self.amount
            )));
        }
        Ok(())
    }
}

/// A recorded transaction. Read-only input to rule evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id:                 EntityId,
    pub external_id:        String,
    pub date:               DateTime<Utc>,
    pub source_account_key: Option<AccountKey>,
    pub target_account_key: Option<AccountKey>,
    pub amount:             f64,
    pub currency:           String,
    #[serde(rename = "type")]
    pub txn_type:           TransactionType,
    pub metadata:           Option<serde_json::Value>,
    pub processed_at:       Option<DateTime<Utc>>,
}

impl Transaction {
    pub fn from_new(id: EntityId, new: NewTransaction, processed_at: DateTime<Utc>) -> Self {
        Self {
            id,
            external_id:        new.external_id,
            date:               new.date,
            source_account_key: new.source_account_key,
            target_account_key: new.target_account_key,
            amount:             new.amount,
            currency:           new.currency,
            txn_type:           new.txn_type,
            metadata:           new.metadata,
            processed_at:       Some(processed_at),
        }
    }

    /// The UTC calendar day the transaction belongs to.
    pub fn day(&self) -> NaiveDate {
        self.date.date_naive()
    }
}
