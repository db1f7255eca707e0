use crate::core::{BackendCapabilities, DbError, Result};
use crate::model::TableMeta;
use serde::{Deserialize, Serialize};

/// Behavior when an inserted row collides with an existing unique constraint.
///
/// None   : let the backend fail the statement
/// Ignore : drop the colliding row, keep the rest
/// Update : overwrite the listed fields on the existing row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnConflict {
    None,
    Ignore,
    Update {
        /// Fields rewritten on the existing row, in caller order.
        update_fields: Vec<String>,
        /// Unique columns that trigger the upsert (the conflict target).
        /// Empty when the backend infers the target itself.
        unique_fields: Vec<String>,
    },
}

impl OnConflict {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Validate and normalize the caller's conflict-handling intent against the
/// backend's capabilities. Pure validation, no side effects.
///
/// The literal name `"pk"` inside `unique_fields` is a sentinel for the
/// primary-key field: it skips field resolution and lands in the policy as
/// the key column's real name.
pub fn resolve_on_conflict(
    meta: &TableMeta,
    caps: &BackendCapabilities,
    ignore_conflicts: bool,
    update_conflicts: bool,
    update_fields: &[String],
    unique_fields: &[String],
) -> Result<OnConflict> {
    if ignore_conflicts && update_conflicts {
        return Err(DbError::InvalidArgument(
            "ignore_conflicts and update_conflicts are mutually exclusive".into(),
        ));
    }

    if ignore_conflicts {
        if !caps.supports_ignore_conflicts {
            return Err(DbError::Unsupported(
                "this backend does not support ignoring conflicts".into(),
            ));
        }
        return Ok(OnConflict::Ignore);
    }

    if update_conflicts {
        if !caps.supports_update_conflicts {
            return Err(DbError::Unsupported(
                "this backend does not support updating conflicts".into(),
            ));
        }
        if update_fields.is_empty() {
            return Err(DbError::InvalidArgument(
                "fields to update when a row insertion fails on conflict must be provided".into(),
            ));
        }
        if !unique_fields.is_empty() && !caps.supports_update_conflicts_with_target {
            return Err(DbError::Unsupported(
                "this backend does not support updating conflicts with an explicit \
                 set of unique fields"
                    .into(),
            ));
        }
        if unique_fields.is_empty() && caps.supports_update_conflicts_with_target {
            return Err(DbError::InvalidArgument(
                "unique fields that can trigger the upsert must be provided".into(),
            ));
        }

        let resolved_update = resolve_fields(meta, update_fields, "update_fields")?;
        for field in &resolved_update {
            if field.primary_key {
                return Err(DbError::InvalidArgument(
                    "primary keys cannot be used in update_fields".into(),
                ));
            }
        }

        let mut resolved_unique = Vec::with_capacity(unique_fields.len());
        for name in unique_fields {
            // The primary key is allowed in unique_fields under its sentinel
            // name and bypasses the concreteness screening.
            if name == "pk" {
                resolved_unique.push(meta.pk()?.name.clone());
                continue;
            }
            let field = resolve_fields(meta, std::slice::from_ref(name), "unique_fields")?;
            resolved_unique.push(field[0].name.clone());
        }

        return Ok(OnConflict::Update {
            update_fields: resolved_update.iter().map(|f| f.name.clone()).collect(),
            unique_fields: resolved_unique,
        });
    }

    Ok(OnConflict::None)
}

/// Resolve names against the field set, rejecting anything without a column
/// of its own.
fn resolve_fields<'a>(
    meta: &'a TableMeta,
    names: &[String],
    argument: &str,
) -> Result<Vec<&'a crate::model::FieldDef>> {
    let mut fields = Vec::with_capacity(names.len());
    for name in names {
        let field = meta
            .find_field(name)
            .ok_or_else(|| DbError::FieldNotFound(name.clone(), meta.table().to_string()))?;
        if !field.is_concrete() {
            return Err(DbError::InvalidArgument(format!(
                "bulk writes can only target concrete fields in {argument}, '{name}' is not"
            )));
        }
        fields.push(field);
    }
    Ok(fields)
}
