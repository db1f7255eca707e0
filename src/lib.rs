// ============================================================================
// rowbatch: bulk insert planning and execution for parameter-limited backends
// ============================================================================
//
// Some distributed SQL backends cannot auto-assign primary keys and cap the
// number of bound parameters per statement. This crate adapts "insert many
// rows" to those constraints: it assigns client-side keys where the backend
// cannot, partitions entities into correctly-ordered, correctly-sized
// batches, applies a validated conflict policy, and reconciles
// server-returned values back onto the caller's objects, all inside a
// single atomic transaction.

pub mod conflict;
pub mod core;
pub mod executor;
pub mod facade;
pub mod keygen;
pub mod model;
pub mod planner;
pub mod storage;
pub mod transaction;

// Re-export main types for convenience
pub use conflict::{resolve_on_conflict, OnConflict};
pub use core::{BackendCapabilities, DbError, Result, Row, Value};
pub use facade::{BulkCreateOptions, BulkWriter};
pub use keygen::{assign_keys, KeyGenerator, RandomKeyGenerator, ServerAssignedKeys};
pub use model::{Entity, EntityState, FieldDef, FieldKind, ParentMeta, TableMeta};
pub use planner::{Batch, BatchPlan};
pub use storage::{MemoryEngine, StorageEngine};
pub use transaction::{AtomicScope, TransactionId};
