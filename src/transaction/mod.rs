use crate::core::Result;
use crate::storage::StorageEngine;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub u64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn-{}", self.0)
    }
}

/// One atomic unit of work over a storage engine.
///
/// Entering either begins a fresh transaction or joins one the caller already
/// holds. Joined scopes never commit or roll back (no savepoint): the outcome
/// belongs to whoever opened the outer transaction, so a failure inside a
/// joined scope propagates up and aborts the whole enclosing unit.
pub struct AtomicScope<'a> {
    engine: &'a dyn StorageEngine,
    txn: TransactionId,
    owned: bool,
}

impl<'a> AtomicScope<'a> {
    pub async fn enter(
        engine: &'a dyn StorageEngine,
        existing: Option<TransactionId>,
    ) -> Result<AtomicScope<'a>> {
        match existing {
            Some(txn) => Ok(Self {
                engine,
                txn,
                owned: false,
            }),
            None => {
                let txn = engine.begin().await?;
                Ok(Self {
                    engine,
                    txn,
                    owned: true,
                })
            }
        }
    }

    pub fn txn(&self) -> TransactionId {
        self.txn
    }

    /// Close the scope: commit on success, roll back on error. The original
    /// error always wins over a rollback failure.
    pub async fn complete(self, result: Result<()>) -> Result<()> {
        if !self.owned {
            return result;
        }
        match result {
            Ok(()) => self.engine.commit(self.txn).await,
            Err(err) => {
                if let Err(rollback_err) = self.engine.rollback(self.txn).await {
                    tracing::warn!(txn = %self.txn, error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}
