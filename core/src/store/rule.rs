use super::TmsStore;
use crate::{
    error::{TmsError, TmsResult},
    types::{EntityId, RuleId},
};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

/// A persisted rule. `name` is the id of the rule implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub id:   EntityId,
    pub name: String,
}

impl TmsStore {
    // ── Rules ─────────────────────────────────────────────────────

    pub fn create_rule(&self, name: &str) -> TmsResult<RuleRecord> {
        let record = RuleRecord {
            id:   uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
        };
        let inserted = self.conn.execute(
            "INSERT INTO rule (id, name) VALUES (?1, ?2)",
            params![record.id, record.name],
        );
        match inserted {
            Ok(_) => Ok(record),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Err(TmsError::Conflict(format!("Rule '{name}' already exists")))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn find_rule_by_name(&self, name: &str) -> TmsResult<Option<RuleRecord>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name FROM rule WHERE name = ?1",
                params![name],
                |row| Ok(RuleRecord { id: row.get(0)?, name: row.get(1)? }),
            )
            .optional()?)
    }

    pub fn rule_by_name(&self, name: &str) -> TmsResult<RuleRecord> {
        self.find_rule_by_name(name)?.ok_or_else(|| TmsError::NotFound {
            entity: "Rule",
            key:    name.to_string(),
        })
    }

    pub fn list_rules(&self) -> TmsResult<Vec<RuleRecord>> {
        let mut stmt = self.conn.prepare("SELECT id, name FROM rule ORDER BY rowid ASC")?;
        let rules = stmt
            .query_map([], |row| Ok(RuleRecord { id: row.get(0)?, name: row.get(1)? }))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rules)
    }

    /// Create a record for every rule id that has none yet.
    /// Returns how many were created.
    pub fn seed_rules(&self, rule_ids: &[RuleId]) -> TmsResult<usize> {
        let mut created = 0;
        for name in rule_ids {
            if self.find_rule_by_name(name)?.is_none() {
                self.create_rule(name)?;
                log::info!("Created rule record: {name}");
                created += 1;
            }
        }
        Ok(created)
    }
}
