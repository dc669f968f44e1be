//! High-risk account matching.

use std::collections::HashSet;

/// Merchant accounts flagged as high-risk out of the box.
pub const DEFAULT_HIGH_RISK_ACCOUNTS: [&str; 10] = [
    "merchant-gambling-001",
    "merchant-crypto-exchange-001",
    "merchant-crypto-exchange-002",
    "merchant-offshore-001",
    "merchant-adult-content-001",
    "merchant-unregulated-gaming-001",
    "merchant-high-value-luxury-001",
    "merchant-anonymous-payments-001",
    "merchant-foreign-shell-001",
    "merchant-sanctioned-country-001",
];

/// Membership test for high-risk account identifiers. Must be pure.
pub trait RiskAccounts: Send + Sync {
    fn is_match(&self, account: &str) -> bool;
}

/// A fixed set of risk accounts, loaded once.
#[derive(Debug, Clone, Default)]
pub struct StaticRiskAccounts {
    accounts: HashSet<String>,
}

impl StaticRiskAccounts {
    pub fn new<I, S>(accounts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            accounts: accounts.into_iter().map(Into::into).collect(),
        }
    }

    pub fn builtin() -> Self {
        Self::new(DEFAULT_HIGH_RISK_ACCOUNTS)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl RiskAccounts for StaticRiskAccounts {
    fn is_match(&self, account: &str) -> bool {
        self.accounts.contains(account)
    }
}
