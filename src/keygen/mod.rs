use crate::core::{Result, Value};
use crate::model::{Entity, TableMeta};

/// Pluggable primary-key generation strategy.
///
/// `None` means "leave the key absent": the backend assigns one and the
/// returning clause reports it back. Backends without row-returning bulk
/// inserts need a generator that always produces a value.
pub trait KeyGenerator: Send + Sync {
    fn generate(&self) -> Option<Value>;
}

/// Default strategy for backends that cannot auto-assign keys: a 63-bit
/// non-negative integer taken from the low bits of a random 128-bit UUID.
/// Random (rather than sequential) keys avoid write hotspots on backends
/// that range-shard rows by primary key.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomKeyGenerator;

impl KeyGenerator for RandomKeyGenerator {
    fn generate(&self) -> Option<Value> {
        // Mask to 63 bits so the value is a valid non-negative i64.
        let raw = uuid::Uuid::new_v4().as_u128() & 0x7FFF_FFFF_FFFF_FFFF;
        Some(Value::Integer(raw as i64))
    }
}

/// Strategy for backends whose bulk insert can return server-generated keys:
/// declines every assignment so the key column stays with the backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerAssignedKeys;

impl KeyGenerator for ServerAssignedKeys {
    fn generate(&self) -> Option<Value> {
        None
    }
}

/// Assign primary keys to entities that lack one. Entities already carrying a
/// key are untouched, so the pass is idempotent.
///
/// Precondition: related-entity references have already been resolved to
/// concrete foreign-key values by the metadata layer; this pass only fills
/// key columns.
pub fn assign_keys(
    entities: &mut [Entity],
    meta: &TableMeta,
    generator: &dyn KeyGenerator,
) -> Result<()> {
    let pk = meta.pk()?.name.clone();
    for entity in entities.iter_mut() {
        if entity.has_pk(meta) {
            continue;
        }
        if let Some(key) = generator.generate() {
            entity.set(pk.clone(), key);
        }
    }
    Ok(())
}
