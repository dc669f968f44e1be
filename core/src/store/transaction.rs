use super::TmsStore;
use crate::{
    error::{TmsError, TmsResult},
    transaction::{Transaction, TransactionType},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

const SELECT_TXN: &str = "
    SELECT id, external_id, date, source_account_key, target_account_key,
           amount, currency, txn_type, metadata, processed_at
    FROM txn";

/// A txn row before its text columns are parsed.
struct TxnRow {
    id:                 String,
    external_id:        String,
    date:               String,
    source_account_key: Option<String>,
    target_account_key: Option<String>,
    amount:             f64,
    currency:           String,
    txn_type:           String,
    metadata:           Option<String>,
    processed_at:       Option<String>,
}

impl TxnRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id:                 row.get(0)?,
            external_id:        row.get(1)?,
            date:               row.get(2)?,
            source_account_key: row.get(3)?,
            target_account_key: row.get(4)?,
            amount:             row.get(5)?,
            currency:           row.get(6)?,
            txn_type:           row.get(7)?,
            metadata:           row.get(8)?,
            processed_at:       row.get(9)?,
        })
    }

    fn into_transaction(self) -> TmsResult<Transaction> {
        Ok(Transaction {
            id:                 self.id,
            external_id:        self.external_id,
            date:               parse_timestamp(&self.date)?,
            source_account_key: self.source_account_key,
            target_account_key: self.target_account_key,
            amount:             self.amount,
            currency:           self.currency,
            txn_type:           TransactionType::parse(&self.txn_type)?,
            metadata:           self.metadata.as_deref().map(serde_json::from_str).transpose()?,
            processed_at:       self.processed_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

pub(crate) fn parse_timestamp(text: &str) -> TmsResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(text)?.with_timezone(&Utc))
}

impl TmsStore {
    // ── Transactions ──────────────────────────────────────────────

    /// Persist a transaction. A second transaction with the same
    /// `external_id` is rejected with `TmsError::Conflict`.
    pub fn insert_transaction(&self, txn: &Transaction) -> TmsResult<()> {
        let metadata = txn.metadata.as_ref().map(serde_json::to_string).transpose()?;
        let inserted = self.conn.execute(
            "INSERT INTO txn (id, external_id, date, source_account_key, target_account_key,
                              amount, currency, txn_type, metadata, processed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                txn.id,
                txn.external_id,
                txn.date.to_rfc3339(),
                txn.source_account_key,
                txn.target_account_key,
                txn.amount,
                txn.currency,
                txn.txn_type.as_str(),
                metadata,
                txn.processed_at.map(|at| at.to_rfc3339()),
            ],
        );

        match inserted {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Err(TmsError::Conflict(format!(
                    "Transaction with external_id '{}' already exists",
                    txn.external_id
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_transaction(&self, id: &str) -> TmsResult<Option<Transaction>> {
        let row = self
            .conn
            .query_row(&format!("{SELECT_TXN} WHERE id = ?1"), params![id], TxnRow::from_row)
            .optional()?;
        row.map(TxnRow::into_transaction).transpose()
    }

    pub fn transaction_by_external_id(&self, external_id: &str) -> TmsResult<Option<Transaction>> {
        let row = self
            .conn
            .query_row(
                &format!("{SELECT_TXN} WHERE external_id = ?1"),
                params![external_id],
                TxnRow::from_row,
            )
            .optional()?;
        row.map(TxnRow::into_transaction).transpose()
    }

    /// All transactions in insertion order.
    pub fn list_transactions(&self) -> TmsResult<Vec<Transaction>> {
        let mut stmt = self.conn.prepare(&format!("{SELECT_TXN} ORDER BY rowid ASC"))?;
        let rows = stmt
            .query_map([], TxnRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(TxnRow::into_transaction).collect()
    }

    pub fn transaction_count(&self) -> TmsResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM txn", [], |row| row.get(0))?;
        Ok(count)
    }
}
