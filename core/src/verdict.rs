//! Rule outcomes.

use crate::types::RuleId;
use serde::{Deserialize, Serialize};

/// What a single rule decided about a single transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Clear,
    Suspicious { reason: String },
}

impl Verdict {
    pub fn suspicious(reason: impl Into<String>) -> Self {
        Verdict::Suspicious { reason: reason.into() }
    }

    pub fn is_suspicious(&self) -> bool {
        matches!(self, Verdict::Suspicious { .. })
    }
}

/// A verdict tagged with the rule that produced it.
///
/// `reason` is `Some` exactly when `is_suspicious` is true. Build values
/// through [`RuleEvalResult::new`] or [`RuleEvalResult::rule_failed`] to
/// keep that pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleEvalResult {
    pub rule_id:       String,
    pub is_suspicious: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason:        Option<String>,
}

impl RuleEvalResult {
    pub fn new(rule_id: RuleId, verdict: Verdict) -> Self {
        match verdict {
            Verdict::Clear => Self {
                rule_id:       rule_id.to_string(),
                is_suspicious: false,
                reason:        None,
            },
            Verdict::Suspicious { reason } => Self {
                rule_id:       rule_id.to_string(),
                is_suspicious: true,
                reason:        Some(reason),
            },
        }
    }

    /// The conservative result recorded when a rule could not be evaluated.
    pub fn rule_failed(rule_id: RuleId, message: &str) -> Self {
        Self::new(
            rule_id,
            Verdict::suspicious(format!("Error evaluating rule: {rule_id} - {message}")),
        )
    }
}
