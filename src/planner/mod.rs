use crate::model::{Entity, TableMeta};

/// One row-count-bounded slice of the caller's entity list.
///
/// Batches hold positions into the original slice rather than entities, so
/// the caller's collection stays authoritative and write-back lands on the
/// original objects by index. A batch never mixes keyed and unkeyed entities:
/// the two differ in insert field list and returned-column mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub indices: Vec<usize>,
    pub keyed: bool,
}

/// The full insert plan for one call: keyed batches first, unkeyed after.
#[derive(Debug, Clone, Default)]
pub struct BatchPlan {
    pub with_key: Vec<Batch>,
    pub without_key: Vec<Batch>,
}

impl BatchPlan {
    /// Partition entities on key presence and slice each group into
    /// `batch_size`-row chunks.
    ///
    /// The partition is stable: original relative order is preserved inside
    /// each group because downstream result mapping is positional. The last
    /// chunk of a group may be short; an empty group yields no batches.
    pub fn build(entities: &[Entity], meta: &TableMeta, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);

        let mut keyed = Vec::new();
        let mut unkeyed = Vec::new();
        for (index, entity) in entities.iter().enumerate() {
            if entity.has_pk(meta) {
                keyed.push(index);
            } else {
                unkeyed.push(index);
            }
        }

        Self {
            with_key: chunk(&keyed, batch_size, true),
            without_key: chunk(&unkeyed, batch_size, false),
        }
    }

    pub fn batch_count(&self) -> usize {
        self.with_key.len() + self.without_key.len()
    }

    /// Batches in execution order: all keyed batches, then all unkeyed ones.
    /// Later batches may reference keys assigned earlier in the same call, so
    /// this order is part of the contract.
    pub fn ordered(&self) -> impl Iterator<Item = &Batch> {
        self.with_key.iter().chain(self.without_key.iter())
    }
}

fn chunk(indices: &[usize], batch_size: usize, keyed: bool) -> Vec<Batch> {
    indices
        .chunks(batch_size)
        .map(|slice| Batch {
            indices: slice.to_vec(),
            keyed,
        })
        .collect()
}
