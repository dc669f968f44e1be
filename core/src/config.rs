use crate::risk_accounts::{StaticRiskAccounts, DEFAULT_HIGH_RISK_ACCOUNTS};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Detection thresholds read by the built-in rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleThresholds {
    /// Daily cumulative amount above which an account is flagged.
    pub daily_total_threshold: f64,
    pub velocity_window_minutes: i64,
    /// Transactions per window above which an account is flagged.
    pub velocity_count_threshold: i64,
    pub dormancy_threshold_days: i64,
    /// Daily total (amount, not count) at or above which a reactivated
    /// dormant account is flagged.
    pub dormant_daily_total_threshold: f64,
    pub dormant_flag_ttl_secs: i64,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            daily_total_threshold:         10_000.0,
            velocity_window_minutes:       30,
            velocity_count_threshold:      5,
            dormancy_threshold_days:       90,
            dormant_daily_total_threshold: 5.0,
            dormant_flag_ttl_secs:         60 * 60 * 24,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RiskAccountsFile {
    accounts: Vec<String>,
}

/// Ingests between two sweeps of expired account history.
pub const DEFAULT_HISTORY_PURGE_INTERVAL: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub thresholds:    RuleThresholds,
    pub risk_accounts: Vec<String>,
    /// The monitor purges expired history every this many ingests.
    /// Zero disables the sweep.
    pub history_purge_interval: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            thresholds:    RuleThresholds::default(),
            risk_accounts: DEFAULT_HIGH_RISK_ACCOUNTS.iter().map(|a| a.to_string()).collect(),
            history_purge_interval: DEFAULT_HISTORY_PURGE_INTERVAL,
        }
    }
}

impl EngineConfig {
    /// Load overrides from `<data_dir>/rules/`. Missing files keep defaults.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let mut config = Self::default();

        let thresholds_path = format!("{data_dir}/rules/thresholds.json");
        if Path::new(&thresholds_path).exists() {
            let content = std::fs::read_to_string(&thresholds_path)
                .map_err(|e| anyhow::anyhow!("Cannot read {thresholds_path}: {e}"))?;
            config.thresholds = serde_json::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Malformed {thresholds_path}: {e}"))?;
        } else {
            log::debug!("{thresholds_path} not found, using default thresholds");
        }

        let risk_path = format!("{data_dir}/rules/risk_accounts.json");
        if Path::new(&risk_path).exists() {
            let content = std::fs::read_to_string(&risk_path)
                .map_err(|e| anyhow::anyhow!("Cannot read {risk_path}: {e}"))?;
            let file: RiskAccountsFile = serde_json::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Malformed {risk_path}: {e}"))?;
            config.risk_accounts = file.accounts;
        } else {
            log::debug!("{risk_path} not found, using built-in risk accounts");
        }

        Ok(config)
    }

    pub fn risk_accounts(&self) -> StaticRiskAccounts {
        StaticRiskAccounts::new(self.risk_accounts.iter().cloned())
    }
}
