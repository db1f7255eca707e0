use crate::conflict::{resolve_on_conflict, OnConflict};
use crate::core::{DbError, Result};
use crate::executor::BulkInsertExecutor;
use crate::keygen::{assign_keys, KeyGenerator, RandomKeyGenerator};
use crate::model::{Entity, TableMeta};
use crate::planner::BatchPlan;
use crate::storage::StorageEngine;
use crate::transaction::{AtomicScope, TransactionId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Caller intent for one `bulk_create` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkCreateOptions {
    batch_size: Option<usize>,
    ignore_conflicts: bool,
    update_conflicts: bool,
    update_fields: Vec<String>,
    unique_fields: Vec<String>,
}

impl BulkCreateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap rows per statement. The backend's parameter ceiling still wins:
    /// a hint can only lower the effective batch size, never raise it.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Drop rows that collide with an existing unique constraint.
    pub fn ignore_conflicts(mut self) -> Self {
        self.ignore_conflicts = true;
        self
    }

    /// Turn colliding rows into updates of the listed fields.
    pub fn update_conflicts<I, S>(mut self, update_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.update_conflicts = true;
        self.update_fields = update_fields.into_iter().map(Into::into).collect();
        self
    }

    /// Unique columns that trigger the upsert, for backends that need an
    /// explicit conflict target. `"pk"` names the primary key.
    pub fn unique_fields<I, S>(mut self, unique_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique_fields = unique_fields.into_iter().map(Into::into).collect();
        self
    }
}

/// Coordinates a bulk insert: key assignment, batch planning and per-batch
/// execution under one atomic scope.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use rowbatch::{
///     BackendCapabilities, BulkCreateOptions, BulkWriter, Entity, FieldDef, MemoryEngine,
///     TableMeta, Value,
/// };
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let meta = TableMeta::new("app_user", "User")
///     .field(FieldDef::new("id").primary_key().auto_key().returning())
///     .field(FieldDef::new("name"));
///
/// let engine = Arc::new(MemoryEngine::new(BackendCapabilities::new()));
/// engine.create_table(&meta).await?;
///
/// let writer = BulkWriter::new(engine);
/// let mut entities = vec![
///     Entity::with_values([("name", Value::from("ada"))]),
///     Entity::with_values([("name", Value::from("grace"))]),
/// ];
/// writer.bulk_create(&meta, &mut entities, &BulkCreateOptions::new()).await?;
///
/// assert!(entities.iter().all(|e| !e.is_new()));
/// # Ok(())
/// # }
/// ```
pub struct BulkWriter {
    engine: Arc<dyn StorageEngine>,
    key_generator: Arc<dyn KeyGenerator>,
}

impl BulkWriter {
    /// A writer with the default key strategy: random client-assigned 63-bit
    /// keys, for backends that cannot assign keys themselves.
    pub fn new(engine: Arc<dyn StorageEngine>) -> Self {
        Self {
            engine,
            key_generator: Arc::new(RandomKeyGenerator),
        }
    }

    pub fn with_key_generator(mut self, generator: Arc<dyn KeyGenerator>) -> Self {
        self.key_generator = generator;
        self
    }

    /// Insert every entity, mutating the slice in place: missing keys are
    /// assigned, server-returned values written back, and each entity is
    /// marked persisted. All statements run inside one transaction; any
    /// failure rolls the whole call back.
    pub async fn bulk_create(
        &self,
        meta: &TableMeta,
        entities: &mut [Entity],
        options: &BulkCreateOptions,
    ) -> Result<()> {
        self.bulk_create_scoped(None, meta, entities, options).await
    }

    /// Same operation inside a transaction the caller already opened. No
    /// savepoint is taken: a failure here aborts the caller's whole
    /// transaction, and the caller commits or rolls back.
    pub async fn bulk_create_in(
        &self,
        txn: TransactionId,
        meta: &TableMeta,
        entities: &mut [Entity],
        options: &BulkCreateOptions,
    ) -> Result<()> {
        self.bulk_create_scoped(Some(txn), meta, entities, options)
            .await
    }

    async fn bulk_create_scoped(
        &self,
        existing: Option<TransactionId>,
        meta: &TableMeta,
        entities: &mut [Entity],
        options: &BulkCreateOptions,
    ) -> Result<()> {
        if options.batch_size == Some(0) {
            return Err(DbError::InvalidArgument(
                "batch size must be a positive integer".into(),
            ));
        }
        meta.ensure_single_table()?;
        if entities.is_empty() {
            return Ok(());
        }

        // All validation happens before any database work begins.
        let caps = self.engine.capabilities();
        let on_conflict = resolve_on_conflict(
            meta,
            caps,
            options.ignore_conflicts,
            options.update_conflicts,
            &options.update_fields,
            &options.unique_fields,
        )?;

        // Row budget per statement, derived from the backend's parameter
        // ceiling and the column count. A caller hint may only lower it.
        let field_count = meta.concrete_fields().len().max(1);
        let ceiling = (caps.max_query_params / field_count).max(1);
        let batch_size = options.batch_size.map_or(ceiling, |hint| hint.min(ceiling));

        let scope = AtomicScope::enter(self.engine.as_ref(), existing).await?;
        let txn = scope.txn();
        let result = self
            .run(txn, meta, entities, batch_size, &on_conflict)
            .await;
        scope.complete(result).await
    }

    async fn run(
        &self,
        txn: TransactionId,
        meta: &TableMeta,
        entities: &mut [Entity],
        batch_size: usize,
        on_conflict: &OnConflict,
    ) -> Result<()> {
        assign_keys(entities, meta, self.key_generator.as_ref())?;

        let plan = BatchPlan::build(entities, meta, batch_size);
        tracing::debug!(
            table = meta.table(),
            entities = entities.len(),
            batch_size,
            keyed_batches = plan.with_key.len(),
            unkeyed_batches = plan.without_key.len(),
            "planned bulk insert"
        );

        // Strictly sequential: batches share one transaction and later
        // batches may reference keys assigned earlier in this call.
        let executor = BulkInsertExecutor::new(self.engine.as_ref(), meta);
        for batch in plan.ordered() {
            executor
                .execute_batch(txn, entities, batch, on_conflict)
                .await?;
        }
        Ok(())
    }
}
