use super::meta::TableMeta;
use crate::core::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Persistence state carried alongside an entity's values: whether the row
/// has been written yet and which connection it was written through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityState {
    pub adding: bool,
    pub db: Option<String>,
}

impl Default for EntityState {
    fn default() -> Self {
        Self {
            adding: true,
            db: None,
        }
    }
}

/// An in-memory record destined for a table row.
///
/// Created and owned by the caller; the write path borrows entities mutably
/// for the duration of one call and mutates them in place: the key assigner
/// fills missing primary keys, the insert executor writes server-returned
/// column values back and flips the persistence state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Entity {
    values: HashMap<String, Value>,
    state: EntityState,
}

impl Entity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an entity from field/value pairs.
    pub fn with_values<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            values: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            state: EntityState::default(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.values.insert(field.into(), value);
    }

    /// The primary-key value, with absent and explicit `Null` entries both
    /// meaning "needs assignment".
    pub fn pk_value(&self, meta: &TableMeta) -> Option<&Value> {
        let pk = meta.fields().iter().find(|f| f.primary_key)?;
        match self.values.get(&pk.name) {
            Some(Value::Null) | None => None,
            Some(v) => Some(v),
        }
    }

    pub fn has_pk(&self, meta: &TableMeta) -> bool {
        self.pk_value(meta).is_some()
    }

    /// True until the row has been persisted.
    pub fn is_new(&self) -> bool {
        self.state.adding
    }

    /// Alias of the connection the row was persisted through.
    pub fn db(&self) -> Option<&str> {
        self.state.db.as_deref()
    }

    pub(crate) fn mark_persisted(&mut self, alias: &str) {
        self.state.adding = false;
        self.state.db = Some(alias.to_string());
    }
}
