use super::field::FieldDef;
use crate::core::{DbError, Result};
use serde::{Deserialize, Serialize};

/// A parent model in an inheritance chain, reduced to what the write path
/// needs: the name of the concrete model its rows actually live in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentMeta {
    pub name: String,
    pub concrete_model: String,
}

/// Table metadata for one model: the ordered column list, the primary key and
/// the inheritance chain.
///
/// Field order is a positional contract. Insert rows and returned rows are
/// both zipped against these lists, so the order here must match the order
/// the statement builder emits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMeta {
    table: String,
    model: String,
    concrete_model: String,
    fields: Vec<FieldDef>,
    parents: Vec<ParentMeta>,
}

impl TableMeta {
    pub fn new(table: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            table: table.into(),
            concrete_model: model.clone(),
            model,
            fields: Vec::new(),
            parents: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn parent(mut self, name: impl Into<String>, concrete_model: impl Into<String>) -> Self {
        self.parents.push(ParentMeta {
            name: name.into(),
            concrete_model: concrete_model.into(),
        });
        self
    }

    /// Override the concrete model this table's rows live in (proxy models).
    pub fn concrete_model(mut self, name: impl Into<String>) -> Self {
        self.concrete_model = name.into();
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The primary-key field, or an error for a model without one. Every
    /// model this write path accepts must carry a key column.
    pub fn pk(&self) -> Result<&FieldDef> {
        self.fields
            .iter()
            .find(|f| f.primary_key)
            .ok_or_else(|| {
                DbError::InvalidArgument(format!("Model '{}' has no primary key field", self.model))
            })
    }

    /// Ordered insert-eligible fields: everything that owns a column.
    pub fn concrete_fields(&self) -> Vec<&FieldDef> {
        self.fields.iter().filter(|f| f.is_concrete()).collect()
    }

    /// Insert field list for one statement.
    ///
    /// When `include_auto_key` is false, fields the backend auto-populates
    /// are left out so the backend assigns them (rows arriving without an
    /// explicit key). Keyed rows pass `true` and carry the full column list.
    pub fn insert_fields(&self, include_auto_key: bool) -> Vec<&FieldDef> {
        self.fields
            .iter()
            .filter(|f| f.is_concrete() && (include_auto_key || !f.auto_key))
            .collect()
    }

    /// Ordered returning subset, the positional contract for returned rows.
    pub fn returning_fields(&self) -> Vec<&FieldDef> {
        self.fields.iter().filter(|f| f.returning).collect()
    }

    /// Reject models spanning a multi-table inheritance hierarchy.
    ///
    /// A parent whose rows live in a different concrete model would need its
    /// own insert per row; this path writes exactly one table. Checking the
    /// concrete model (not a proxy flag) also catches
    /// ConcreteGrandParent -> MultiTableParent -> ProxyChild chains.
    pub fn ensure_single_table(&self) -> Result<()> {
        for parent in &self.parents {
            if parent.concrete_model != self.concrete_model {
                return Err(DbError::InvalidArgument(format!(
                    "Cannot bulk create model '{}': multi-table inheritance via parent '{}'",
                    self.model, parent.name
                )));
            }
        }
        Ok(())
    }
}
