/// Bulk create tests
///
/// End-to-end coverage of the write path: key assignment, ordering,
/// batch sizing and argument validation.
/// Run with: cargo test --test bulk_create_tests
use async_trait::async_trait;
use rowbatch::{
    BackendCapabilities, BulkCreateOptions, BulkWriter, DbError, Entity, FieldDef, MemoryEngine,
    OnConflict, Row, ServerAssignedKeys, StorageEngine, TableMeta, TransactionId, Value,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn user_meta() -> TableMeta {
    TableMeta::new("app_user", "User")
        .field(FieldDef::new("id").primary_key().auto_key().returning())
        .field(FieldDef::new("name"))
        .field(FieldDef::new("rank"))
}

fn named(name: &str) -> Entity {
    Entity::with_values([("name", Value::from(name))])
}

fn keyed(id: i64, name: &str) -> Entity {
    Entity::with_values([("id", Value::Integer(id)), ("name", Value::from(name))])
}

/// Wrapper engine that records every insert statement and transaction begin,
/// delegating the actual work to a `MemoryEngine`.
struct RecordingEngine {
    inner: MemoryEngine,
    begins: AtomicUsize,
    inserts: Mutex<Vec<(usize, Vec<String>)>>,
}

impl RecordingEngine {
    fn new(caps: BackendCapabilities) -> Self {
        Self {
            inner: MemoryEngine::new(caps),
            begins: AtomicUsize::new(0),
            inserts: Mutex::new(Vec::new()),
        }
    }

    fn insert_calls(&self) -> Vec<(usize, Vec<String>)> {
        self.inserts.lock().unwrap().clone()
    }
}

#[async_trait]
impl StorageEngine for RecordingEngine {
    fn alias(&self) -> &str {
        self.inner.alias()
    }

    fn capabilities(&self) -> &BackendCapabilities {
        self.inner.capabilities()
    }

    async fn begin(&self) -> rowbatch::Result<TransactionId> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        self.inner.begin().await
    }

    async fn commit(&self, txn: TransactionId) -> rowbatch::Result<()> {
        self.inner.commit(txn).await
    }

    async fn rollback(&self, txn: TransactionId) -> rowbatch::Result<()> {
        self.inner.rollback(txn).await
    }

    async fn insert(
        &self,
        txn: TransactionId,
        table: &str,
        fields: &[String],
        rows: Vec<Row>,
        on_conflict: &OnConflict,
    ) -> rowbatch::Result<Vec<Row>> {
        self.inserts
            .lock()
            .unwrap()
            .push((rows.len(), fields.to_vec()));
        self.inner.insert(txn, table, fields, rows, on_conflict).await
    }
}

#[tokio::test]
async fn assigns_keys_and_marks_entities_persisted() {
    let meta = user_meta();
    let engine = Arc::new(MemoryEngine::new(BackendCapabilities::new()));
    engine.create_table(&meta).await.unwrap();

    let writer = BulkWriter::new(engine.clone());
    let mut entities = vec![named("ada"), named("grace"), named("edsger")];
    writer
        .bulk_create(&meta, &mut entities, &BulkCreateOptions::new())
        .await
        .unwrap();

    for entity in &entities {
        let Some(Value::Integer(key)) = entity.pk_value(&meta) else {
            panic!("expected an assigned integer key");
        };
        assert!(*key >= 0);
        assert!(!entity.is_new());
        assert_eq!(entity.db(), Some("memory"));
    }
    assert_eq!(engine.row_count("app_user").await.unwrap(), 3);
}

#[tokio::test]
async fn mixed_input_keeps_original_order_and_explicit_keys() {
    let meta = user_meta();
    let engine = Arc::new(
        MemoryEngine::new(BackendCapabilities::new().returning(true).max_query_params(900)),
    );
    engine.create_table(&meta).await.unwrap();

    // Server-assigned keys keep the unkeyed group unkeyed through planning.
    let writer =
        BulkWriter::new(engine.clone()).with_key_generator(Arc::new(ServerAssignedKeys));
    let mut entities = vec![named("first"), keyed(100, "second"), named("third")];
    writer
        .bulk_create(&meta, &mut entities, &BulkCreateOptions::new())
        .await
        .unwrap();

    // Original positions still hold the same logical records.
    assert_eq!(entities[0].get("name"), Some(&Value::from("first")));
    assert_eq!(entities[1].pk_value(&meta), Some(&Value::Integer(100)));
    assert_eq!(entities[2].get("name"), Some(&Value::from("third")));
    assert!(entities.iter().all(|e| e.has_pk(&meta) && !e.is_new()));
}

#[tokio::test]
async fn empty_input_is_a_no_op_without_a_transaction() {
    let meta = user_meta();
    let engine = Arc::new(RecordingEngine::new(BackendCapabilities::new()));
    // No table registered: any engine call would fail.

    let writer = BulkWriter::new(engine.clone());
    let mut entities: Vec<Entity> = Vec::new();
    writer
        .bulk_create(&meta, &mut entities, &BulkCreateOptions::new())
        .await
        .unwrap();

    assert_eq!(engine.begins.load(Ordering::SeqCst), 0);
    assert!(engine.insert_calls().is_empty());
}

#[tokio::test]
async fn zero_batch_size_hint_is_rejected() {
    let meta = user_meta();
    let engine = Arc::new(MemoryEngine::new(BackendCapabilities::new()));
    engine.create_table(&meta).await.unwrap();

    let writer = BulkWriter::new(engine);
    let mut entities = vec![named("a")];
    let err = writer
        .bulk_create(&meta, &mut entities, &BulkCreateOptions::new().batch_size(0))
        .await
        .unwrap_err();

    assert!(matches!(err, DbError::InvalidArgument(_)));
}

#[tokio::test]
async fn multi_table_inheritance_is_rejected() {
    let meta = user_meta().parent("Account", "Account");
    let engine = Arc::new(MemoryEngine::new(BackendCapabilities::new()));

    let writer = BulkWriter::new(engine);
    let mut entities = vec![named("a")];
    let err = writer
        .bulk_create(&meta, &mut entities, &BulkCreateOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, DbError::InvalidArgument(_)));
}

#[tokio::test]
async fn batches_respect_the_parameter_ceiling() {
    let meta = user_meta();
    // 3 concrete columns, 7 parameters -> at most 2 rows per statement.
    let engine = Arc::new(RecordingEngine::new(
        BackendCapabilities::new().max_query_params(7),
    ));
    engine.inner.create_table(&meta).await.unwrap();

    let writer = BulkWriter::new(engine.clone());
    let mut entities: Vec<Entity> = (0..5).map(|i| named(&format!("user-{i}"))).collect();
    writer
        .bulk_create(&meta, &mut entities, &BulkCreateOptions::new())
        .await
        .unwrap();

    let calls = engine.insert_calls();
    let sizes: Vec<usize> = calls.iter().map(|(rows, _)| *rows).collect();
    assert_eq!(sizes, vec![2, 2, 1]);
    for (rows, fields) in &calls {
        assert!(rows * fields.len() <= 7);
    }
}

#[tokio::test]
async fn caller_hint_may_only_lower_the_batch_size() {
    let meta = user_meta();
    let engine = Arc::new(RecordingEngine::new(
        BackendCapabilities::new().max_query_params(6),
    ));
    engine.inner.create_table(&meta).await.unwrap();

    let writer = BulkWriter::new(engine.clone());
    // Ceiling is 2 rows; a hint of 50 must not raise it.
    let mut entities: Vec<Entity> = (0..4).map(|i| named(&format!("user-{i}"))).collect();
    writer
        .bulk_create(&meta, &mut entities, &BulkCreateOptions::new().batch_size(50))
        .await
        .unwrap();

    let sizes: Vec<usize> = engine.insert_calls().iter().map(|(rows, _)| *rows).collect();
    assert_eq!(sizes, vec![2, 2]);

    // A lower hint wins over the ceiling.
    let engine = Arc::new(RecordingEngine::new(
        BackendCapabilities::new().max_query_params(6),
    ));
    engine.inner.create_table(&meta).await.unwrap();
    let writer = BulkWriter::new(engine.clone());
    let mut entities: Vec<Entity> = (0..4).map(|i| named(&format!("user-{i}"))).collect();
    writer
        .bulk_create(&meta, &mut entities, &BulkCreateOptions::new().batch_size(1))
        .await
        .unwrap();

    let sizes: Vec<usize> = engine.insert_calls().iter().map(|(rows, _)| *rows).collect();
    assert_eq!(sizes, vec![1, 1, 1, 1]);
}

#[tokio::test]
async fn keyed_batches_run_before_unkeyed_batches() {
    let meta = user_meta();
    let engine = Arc::new(RecordingEngine::new(
        BackendCapabilities::new().returning(true).max_query_params(900),
    ));
    engine.inner.create_table(&meta).await.unwrap();

    let writer =
        BulkWriter::new(engine.clone()).with_key_generator(Arc::new(ServerAssignedKeys));
    let mut entities = vec![named("u1"), keyed(7, "k1"), named("u2"), keyed(8, "k2")];
    writer
        .bulk_create(&meta, &mut entities, &BulkCreateOptions::new())
        .await
        .unwrap();

    let calls = engine.insert_calls();
    assert_eq!(calls.len(), 2);
    // Keyed batch carries the key column, the unkeyed one leaves it to the
    // backend.
    assert!(calls[0].1.iter().any(|f| f == "id"));
    assert!(!calls[1].1.iter().any(|f| f == "id"));
}
