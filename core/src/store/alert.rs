use super::{transaction::parse_timestamp, TmsStore};
use crate::{
    alert::{Alert, AlertStatus},
    error::{TmsError, TmsResult},
};
use rusqlite::{params, Row};

const SELECT_ALERT: &str = "
    SELECT a.id, a.rule_id, r.name, a.transaction_id, a.status, a.metadata, a.created_at
    FROM alert a
    JOIN rule r ON r.id = a.rule_id";

type AlertRow = (String, String, String, String, String, Option<String>, String);

fn read_row(row: &Row<'_>) -> rusqlite::Result<AlertRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn into_alert(row: AlertRow) -> TmsResult<Alert> {
    let (id, rule_id, rule_name, transaction_id, status, metadata, created_at) = row;
    let reason = match metadata {
        Some(json) => {
            let value: serde_json::Value = serde_json::from_str(&json)?;
            value["reason"].as_str().map(str::to_string)
        }
        None => None,
    };
    Ok(Alert {
        id,
        rule_id,
        rule_name,
        transaction_id,
        status: AlertStatus::parse(&status)?,
        reason,
        created_at: parse_timestamp(&created_at)?,
    })
}

impl TmsStore {
    // ── Alerts ────────────────────────────────────────────────────

    pub fn insert_alert(&self, alert: &Alert) -> TmsResult<()> {
        let metadata = alert
            .reason
            .as_ref()
            .map(|reason| serde_json::json!({ "reason": reason }).to_string());
        self.conn.execute(
            "INSERT INTO alert (id, rule_id, transaction_id, status, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                alert.id,
                alert.rule_id,
                alert.transaction_id,
                alert.status.as_str(),
                metadata,
                alert.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn list_alerts(&self) -> TmsResult<Vec<Alert>> {
        let mut stmt = self.conn.prepare(&format!("{SELECT_ALERT} ORDER BY a.rowid ASC"))?;
        let rows = stmt.query_map([], read_row)?.collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(into_alert).collect()
    }

    pub fn alerts_for_transaction(&self, transaction_id: &str) -> TmsResult<Vec<Alert>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_ALERT} WHERE a.transaction_id = ?1 ORDER BY a.rowid ASC"
        ))?;
        let rows = stmt
            .query_map(params![transaction_id], read_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(into_alert).collect()
    }

    pub fn update_alert_status(&self, alert_id: &str, status: AlertStatus) -> TmsResult<()> {
        let updated = self.conn.execute(
            "UPDATE alert SET status = ?1 WHERE id = ?2",
            params![status.as_str(), alert_id],
        )?;
        if updated == 0 {
            return Err(TmsError::NotFound {
                entity: "Alert",
                key:    alert_id.to_string(),
            });
        }
        Ok(())
    }

    pub fn alert_count(&self) -> TmsResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM alert", [], |row| row.get(0))?;
        Ok(count)
    }
}
