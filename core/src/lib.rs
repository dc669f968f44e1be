//! Transaction monitoring core: per-transaction fraud and AML rule
//! evaluation over TTL-bounded account history.

pub mod alert;
pub mod clock;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod history;
pub mod monitor;
pub mod risk_accounts;
pub mod rules;
pub mod store;
pub mod transaction;
pub mod types;
pub mod verdict;
