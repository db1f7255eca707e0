use crate::conflict::OnConflict;
use crate::core::{DbError, Result, Row, Value};
use crate::model::{Entity, TableMeta};
use crate::planner::Batch;
use crate::storage::StorageEngine;
use crate::transaction::TransactionId;

/// Executes one planned batch against the storage engine and maps returned
/// row data back onto the source entities.
pub struct BulkInsertExecutor<'a> {
    engine: &'a dyn StorageEngine,
    meta: &'a TableMeta,
}

impl<'a> BulkInsertExecutor<'a> {
    pub fn new(engine: &'a dyn StorageEngine, meta: &'a TableMeta) -> Self {
        Self { engine, meta }
    }

    /// Issue the batch's insert inside the enclosing transaction and write
    /// server-returned column values back onto the entities.
    ///
    /// Keyed batches carry the full column list; unkeyed batches leave
    /// auto-populated key fields to the backend. An absent attribute becomes
    /// `Null` in the statement row.
    pub async fn execute_batch(
        &self,
        txn: TransactionId,
        entities: &mut [Entity],
        batch: &Batch,
        on_conflict: &OnConflict,
    ) -> Result<()> {
        let fields = self.meta.insert_fields(batch.keyed);
        let field_names: Vec<String> = fields.iter().map(|f| f.name.clone()).collect();
        let rows: Vec<Row> = batch
            .indices
            .iter()
            .map(|&index| {
                fields
                    .iter()
                    .map(|f| entities[index].get(&f.name).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        tracing::debug!(
            table = self.meta.table(),
            rows = batch.indices.len(),
            keyed = batch.keyed,
            "executing bulk insert batch"
        );

        let returned = self
            .engine
            .insert(txn, self.meta.table(), &field_names, rows, on_conflict)
            .await?;

        // A returning-capable backend must report exactly one row per input
        // row for a plain insert; a mismatch is a broken backend contract,
        // not a caller error.
        let caps = self.engine.capabilities();
        if caps.can_return_rows_from_bulk_insert
            && on_conflict.is_none()
            && returned.len() != batch.indices.len()
        {
            return Err(DbError::ConsistencyViolation(format!(
                "backend returned {} rows for a {}-row bulk insert into '{}'",
                returned.len(),
                batch.indices.len(),
                self.meta.table()
            )));
        }

        // Returned rows align positionally with the returning subset. Keyed
        // entities skip the key column: its value is already known.
        let returning = self.meta.returning_fields();
        for (&index, values) in batch.indices.iter().zip(returned.iter()) {
            for (field, value) in returning.iter().zip(values.iter()) {
                if batch.keyed && field.primary_key {
                    continue;
                }
                entities[index].set(field.name.clone(), value.clone());
            }
        }

        let alias = self.engine.alias();
        for &index in &batch.indices {
            entities[index].mark_persisted(alias);
        }
        Ok(())
    }
}
