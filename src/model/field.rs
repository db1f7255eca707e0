use serde::{Deserialize, Serialize};

/// How a field maps onto the underlying table.
///
/// Only `Concrete` and `Relation` own a column and can appear in an insert
/// statement; the other kinds exist so metadata can describe the whole model
/// and validation can reject them by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Plain column.
    Concrete,
    /// Foreign-key column (concrete: stores the referenced key).
    Relation,
    /// Link-table relation, no column on this table.
    ManyToMany,
    /// Derived value, never stored.
    Computed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    /// This field is the table's primary key.
    pub primary_key: bool,
    /// The backend fills this field itself when no client value is supplied
    /// (autoincrement-style key columns).
    pub auto_key: bool,
    /// Member of the returning subset: the backend can echo this column's
    /// final value back from a bulk insert.
    pub returning: bool,
}

impl FieldDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Concrete,
            primary_key: false,
            auto_key: false,
            returning: false,
        }
    }

    pub fn relation(name: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::Relation,
            ..Self::new(name)
        }
    }

    pub fn many_to_many(name: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::ManyToMany,
            ..Self::new(name)
        }
    }

    pub fn computed(name: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::Computed,
            ..Self::new(name)
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn auto_key(mut self) -> Self {
        self.auto_key = true;
        self
    }

    pub fn returning(mut self) -> Self {
        self.returning = true;
        self
    }

    /// Whether the field owns a column on this table.
    pub fn is_concrete(&self) -> bool {
        matches!(self.kind, FieldKind::Concrete | FieldKind::Relation)
    }
}
