use super::Value;
use serde::{Deserialize, Serialize};

pub type Row = Vec<Value>;

/// Feature flags and limits for the target backend.
///
/// Handed to the engine once at construction and treated as read-only
/// configuration afterwards; the write path never probes the connection
/// directly, which keeps planning testable against synthetic capability sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendCapabilities {
    /// Backend understands an "ignore duplicate rows" insert clause.
    pub supports_ignore_conflicts: bool,
    /// Backend understands an "update on duplicate" insert clause.
    pub supports_update_conflicts: bool,
    /// Upserts require an explicit conflict target (unique column list).
    pub supports_update_conflicts_with_target: bool,
    /// Bulk inserts can hand server-generated column values back to the client.
    pub can_return_rows_from_bulk_insert: bool,
    /// Hard ceiling on bound parameters per statement.
    pub max_query_params: usize,
}

impl Default for BackendCapabilities {
    fn default() -> Self {
        Self {
            supports_ignore_conflicts: false,
            supports_update_conflicts: false,
            supports_update_conflicts_with_target: false,
            can_return_rows_from_bulk_insert: false,
            max_query_params: 900,
        }
    }
}

impl BackendCapabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore_conflicts(mut self, supported: bool) -> Self {
        self.supports_ignore_conflicts = supported;
        self
    }

    pub fn update_conflicts(mut self, supported: bool) -> Self {
        self.supports_update_conflicts = supported;
        self
    }

    pub fn update_conflicts_with_target(mut self, supported: bool) -> Self {
        self.supports_update_conflicts_with_target = supported;
        self
    }

    pub fn returning(mut self, supported: bool) -> Self {
        self.can_return_rows_from_bulk_insert = supported;
        self
    }

    pub fn max_query_params(mut self, limit: usize) -> Self {
        self.max_query_params = limit;
        self
    }
}
