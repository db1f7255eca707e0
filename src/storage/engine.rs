use crate::conflict::OnConflict;
use crate::core::{BackendCapabilities, Result, Row};
use crate::transaction::TransactionId;
use async_trait::async_trait;

/// Statement-executor seam between the write path and a concrete backend.
///
/// The engine owns statement construction and the wire protocol; the write
/// path only hands it ordered field names and positional rows. Implementations
/// must keep returned rows aligned with the table's registered returning
/// subset, one row per written input row, and return an empty list when the
/// backend cannot report rows back from a bulk insert.
#[async_trait]
pub trait StorageEngine: Send + Sync {
    /// Connection alias entities get bound to after a successful write.
    fn alias(&self) -> &str {
        "default"
    }

    /// Static feature flags and limits for this backend.
    fn capabilities(&self) -> &BackendCapabilities;

    /// Open a new transaction.
    async fn begin(&self) -> Result<TransactionId>;

    /// Commit a transaction, making all writes staged under it visible.
    async fn commit(&self, txn: TransactionId) -> Result<()>;

    /// Abort a transaction, discarding all writes staged under it.
    async fn rollback(&self, txn: TransactionId) -> Result<()>;

    /// Insert `rows` (positionally aligned with `fields`) into `table` under
    /// the given transaction, applying the conflict policy.
    async fn insert(
        &self,
        txn: TransactionId,
        table: &str,
        fields: &[String],
        rows: Vec<Row>,
        on_conflict: &OnConflict,
    ) -> Result<Vec<Row>>;
}
