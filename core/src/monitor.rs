//! Ingestion path: record a transaction, evaluate it, raise alerts.
//!
//! Evaluation happens immediately after the transaction is recorded, in
//! the same call. There is no durable evaluation queue: if the process
//! dies between `record_transaction` and `inspect`, that transaction is
//! never evaluated.

use crate::{
    alert::{Alert, AlertDispatcher},
    clock::{Clock, SystemClock},
    config::EngineConfig,
    error::TmsResult,
    evaluator::RuleEngine,
    history::{AccountHistory, MemoryAccountHistory},
    risk_accounts::RiskAccounts,
    rules::BuiltinRule,
    store::TmsStore,
    transaction::{NewTransaction, Transaction},
    verdict::RuleEvalResult,
};
use serde::Serialize;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

#[derive(Debug, Clone, Serialize)]
pub struct InspectionReport {
    pub results: Vec<RuleEvalResult>,
    pub alerts:  Vec<Alert>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub transaction: Transaction,
    #[serde(flatten)]
    pub report:      InspectionReport,
}

pub struct TransactionMonitor {
    store:         TmsStore,
    history:       Box<dyn AccountHistory>,
    risk_accounts: Box<dyn RiskAccounts>,
    engine:        RuleEngine,
    clock:         Arc<dyn Clock>,
    purge_every:   u64,
    ingested:      AtomicU64,
}

impl TransactionMonitor {
    /// Wire a monitor. Migrates the store and seeds one rule record per
    /// built-in rule.
    pub fn new(
        store: TmsStore,
        history: Box<dyn AccountHistory>,
        risk_accounts: Box<dyn RiskAccounts>,
        config: &EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> TmsResult<Self> {
        store.migrate()?;
        let created = store.seed_rules(&BuiltinRule::IDS)?;
        log::debug!("Seeded {created} rule records");
        Ok(Self {
            store,
            history,
            risk_accounts,
            engine: RuleEngine::new(&config.thresholds),
            clock,
            purge_every: config.history_purge_interval,
            ingested: AtomicU64::new(0),
        })
    }

    /// A fully in-memory monitor with the given config.
    pub fn in_memory(config: &EngineConfig) -> TmsResult<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self::new(
            TmsStore::in_memory()?,
            Box::new(MemoryAccountHistory::with_clock(clock.clone())),
            Box::new(config.risk_accounts()),
            config,
            clock,
        )
    }

    pub fn store(&self) -> &TmsStore {
        &self.store
    }

    pub fn history(&self) -> &dyn AccountHistory {
        self.history.as_ref()
    }

    /// Validate and persist a new transaction.
    pub fn record_transaction(&self, new: NewTransaction) -> TmsResult<Transaction> {
        new.validate()?;
        let transaction = Transaction::from_new(
            uuid::Uuid::new_v4().to_string(),
            new,
            self.clock.now(),
        );
        self.store.insert_transaction(&transaction)?;
        log::info!(
            "Recorded transaction {} ({})",
            transaction.external_id,
            transaction.id
        );
        Ok(transaction)
    }

    /// Run every rule against a recorded transaction and raise an alert
    /// per suspicious result. Call at most once per transaction.
    pub async fn inspect(&self, transaction: &Transaction) -> TmsResult<InspectionReport> {
        let results = self
            .engine
            .eval_rules(transaction, self.history.as_ref(), self.risk_accounts.as_ref())
            .await;
        let alerts = AlertDispatcher::new(&self.store, self.clock.as_ref())
            .dispatch(&transaction.id, &results)?;
        Ok(InspectionReport { results, alerts })
    }

    /// Record then immediately inspect. Every `history_purge_interval`
    /// ingests, expired account history is swept as well.
    pub async fn ingest(&self, new: NewTransaction) -> TmsResult<IngestOutcome> {
        let transaction = self.record_transaction(new)?;
        let report = self.inspect(&transaction).await?;

        let count = self.ingested.fetch_add(1, Ordering::Relaxed) + 1;
        if self.purge_every > 0 && count % self.purge_every == 0 {
            // A failed sweep does not fail the ingest.
            if let Err(e) = self.purge_expired_history().await {
                log::warn!("Account history purge failed: {e}");
            }
        }
        Ok(IngestOutcome { transaction, report })
    }

    /// Evict expired account history entries now.
    pub async fn purge_expired_history(&self) -> TmsResult<usize> {
        let removed = self.history.purge_expired().await?;
        log::info!("Purged {removed} expired account history entries");
        Ok(removed)
    }

    pub fn list_transactions(&self) -> TmsResult<Vec<Transaction>> {
        self.store.list_transactions()
    }
}
