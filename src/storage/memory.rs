use super::engine::StorageEngine;
use crate::conflict::OnConflict;
use crate::core::{BackendCapabilities, DbError, Result, Row, Value};
use crate::model::TableMeta;
use crate::transaction::TransactionId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

type StoredRow = HashMap<String, Value>;

struct TableData {
    key_column: String,
    returning: Vec<String>,
    rows: Vec<StoredRow>,
    next_serial: i64,
}

enum Pending {
    Insert(StoredRow),
    Update {
        matcher: Vec<(String, Value)>,
        changes: StoredRow,
    },
}

/// In-memory reference engine.
///
/// Writes are staged per transaction and only applied to the committed table
/// state on commit, so all-or-nothing visibility is directly observable.
/// Capability flags are caller-supplied, which lets tests run the write path
/// against arbitrary synthetic backends.
pub struct MemoryEngine {
    alias: String,
    caps: BackendCapabilities,
    tables: RwLock<HashMap<String, TableData>>,
    pending: RwLock<HashMap<TransactionId, Vec<(String, Pending)>>>,
    next_txn: AtomicU64,
}

impl MemoryEngine {
    pub fn new(caps: BackendCapabilities) -> Self {
        Self {
            alias: "memory".to_string(),
            caps,
            tables: RwLock::new(HashMap::new()),
            pending: RwLock::new(HashMap::new()),
            next_txn: AtomicU64::new(1),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    /// Register a table from its model metadata. The key column and the
    /// returning subset are taken from the field definitions.
    pub async fn create_table(&self, meta: &TableMeta) -> Result<()> {
        let key_column = meta.pk()?.name.clone();
        let returning = meta
            .returning_fields()
            .iter()
            .map(|f| f.name.clone())
            .collect();

        let mut tables = self.tables.write().await;
        tables.insert(
            meta.table().to_string(),
            TableData {
                key_column,
                returning,
                rows: Vec::new(),
                next_serial: 1,
            },
        );
        Ok(())
    }

    /// Committed rows of a table. Staged writes of open transactions are
    /// invisible here.
    pub async fn scan(&self, table: &str) -> Result<Vec<StoredRow>> {
        let tables = self.tables.read().await;
        let data = tables
            .get(table)
            .ok_or_else(|| DbError::TableNotFound(table.to_string()))?;
        Ok(data.rows.clone())
    }

    pub async fn row_count(&self, table: &str) -> Result<usize> {
        Ok(self.scan(table).await?.len())
    }
}

impl TableData {
    /// Locate a visible row (committed, or staged insert of the same
    /// transaction) matching all given column values. Returns the row's
    /// current contents.
    fn find_match<'a>(
        &'a self,
        staged: &'a [(String, Pending)],
        table: &str,
        matcher: &[(String, Value)],
    ) -> Option<&'a StoredRow> {
        let matches = |row: &StoredRow| {
            matcher
                .iter()
                .all(|(column, value)| row.get(column) == Some(value))
        };
        if let Some(row) = self.rows.iter().find(|r| matches(r)) {
            return Some(row);
        }
        staged.iter().find_map(|(t, op)| match op {
            Pending::Insert(row) if t == table && matches(row) => Some(row),
            _ => None,
        })
    }
}

#[async_trait]
impl StorageEngine for MemoryEngine {
    fn alias(&self) -> &str {
        &self.alias
    }

    fn capabilities(&self) -> &BackendCapabilities {
        &self.caps
    }

    async fn begin(&self) -> Result<TransactionId> {
        let txn = TransactionId(self.next_txn.fetch_add(1, Ordering::SeqCst));
        let mut pending = self.pending.write().await;
        pending.insert(txn, Vec::new());
        Ok(txn)
    }

    async fn commit(&self, txn: TransactionId) -> Result<()> {
        let staged = {
            let mut pending = self.pending.write().await;
            pending
                .remove(&txn)
                .ok_or_else(|| DbError::ExecutionError(format!("{txn} not found")))?
        };

        let mut tables = self.tables.write().await;
        for (table, op) in staged {
            let data = tables
                .get_mut(&table)
                .ok_or_else(|| DbError::TableNotFound(table.clone()))?;
            match op {
                Pending::Insert(row) => data.rows.push(row),
                Pending::Update { matcher, changes } => {
                    if let Some(row) = data.rows.iter_mut().find(|row| {
                        matcher
                            .iter()
                            .all(|(column, value)| row.get(column) == Some(value))
                    }) {
                        row.extend(changes);
                    }
                }
            }
        }
        Ok(())
    }

    async fn rollback(&self, txn: TransactionId) -> Result<()> {
        let mut pending = self.pending.write().await;
        pending
            .remove(&txn)
            .ok_or_else(|| DbError::ExecutionError(format!("{txn} not found")))?;
        Ok(())
    }

    async fn insert(
        &self,
        txn: TransactionId,
        table: &str,
        fields: &[String],
        rows: Vec<Row>,
        on_conflict: &OnConflict,
    ) -> Result<Vec<Row>> {
        let mut tables = self.tables.write().await;
        let mut pending = self.pending.write().await;

        let data = tables
            .get_mut(table)
            .ok_or_else(|| DbError::TableNotFound(table.to_string()))?;
        let staged = pending
            .get_mut(&txn)
            .ok_or_else(|| DbError::ExecutionError(format!("{txn} not found")))?;

        let mut returned = Vec::new();
        for row in rows {
            if row.len() != fields.len() {
                return Err(DbError::ExecutionError(format!(
                    "Expected {} values, got {}",
                    fields.len(),
                    row.len()
                )));
            }
            let mut stored: StoredRow = fields.iter().cloned().zip(row).collect();

            // Rows arriving without a key get a server-assigned serial, the
            // value the returning clause reports back.
            let key = data.key_column.clone();
            match stored.get(&key) {
                Some(Value::Null) | None => {
                    let serial = data.next_serial;
                    data.next_serial += 1;
                    stored.insert(key.clone(), Value::Integer(serial));
                }
                Some(Value::Integer(explicit)) => {
                    data.next_serial = data.next_serial.max(explicit + 1);
                }
                Some(_) => {}
            }

            let key_value = stored
                .get(&key)
                .cloned()
                .unwrap_or(Value::Null);
            let target = match on_conflict {
                OnConflict::Update { unique_fields, .. } if !unique_fields.is_empty() => {
                    unique_fields
                        .iter()
                        .map(|f| (f.clone(), stored.get(f).cloned().unwrap_or(Value::Null)))
                        .collect::<Vec<_>>()
                }
                _ => vec![(key.clone(), key_value.clone())],
            };

            let existing = data.find_match(staged, table, &target).cloned();
            let final_row = match (existing, on_conflict) {
                (None, _) => {
                    staged.push((table.to_string(), Pending::Insert(stored.clone())));
                    stored
                }
                (Some(_), OnConflict::None) => {
                    return Err(DbError::ConstraintViolation(format!(
                        "duplicate key value '{key_value}' in table '{table}'"
                    )));
                }
                (Some(_), OnConflict::Ignore) => continue,
                (Some(current), OnConflict::Update { update_fields, .. }) => {
                    let changes: StoredRow = update_fields
                        .iter()
                        .map(|f| (f.clone(), stored.get(f).cloned().unwrap_or(Value::Null)))
                        .collect();
                    let mut merged = current;
                    merged.extend(changes.clone());
                    staged.push((
                        table.to_string(),
                        Pending::Update {
                            matcher: target,
                            changes,
                        },
                    ));
                    merged
                }
            };

            if self.caps.can_return_rows_from_bulk_insert {
                returned.push(
                    data.returning
                        .iter()
                        .map(|column| final_row.get(column).cloned().unwrap_or(Value::Null))
                        .collect(),
                );
            }
        }

        Ok(returned)
    }
}
