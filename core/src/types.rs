//! Shared primitive types used across the engine and its stores.

/// An account identifier as supplied by the customer system.
pub type AccountKey = String;

/// A stable, unique identifier for persisted entities (UUID v4 text).
pub type EntityId = String;

/// The stable id of a detection rule. Doubles as the persisted rule name.
pub type RuleId = &'static str;
