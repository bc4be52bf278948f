//! Entity trait and declaration checks.

use crate::repo::error::{RepoError, RepoResult};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;
use rusqlite::Row;
use std::collections::HashSet;

/// Primary key type of every entity.
pub type EntityId = i64;

/// Name of the primary key column shared by all entity tables.
pub const ID_COLUMN: &str = "id";

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// A record type persisted in one table.
///
/// Implementors own the mapping between their fields and table columns; the
/// table itself is created by the caller.
pub trait Entity: Sized {
    /// Human readable type name used in logs and errors.
    const NAME: &'static str;
    /// Backing table.
    const TABLE: &'static str;
    /// Non-id columns, in insertion order.
    const COLUMNS: &'static [&'static str];

    /// `None` until the entity has been persisted.
    fn id(&self) -> Option<EntityId>;

    /// Column values for every entry of `COLUMNS`.
    fn values(&self) -> Vec<(&'static str, Value)>;

    /// Decodes one row selected with `id` plus all `COLUMNS`.
    fn from_row(row: &Row<'_>) -> RepoResult<Self>;
}

/// Returns whether `value` is safe to embed as a SQL identifier.
pub fn is_valid_identifier(value: &str) -> bool {
    IDENTIFIER_RE.is_match(value)
}

/// Checks the static declaration of `E`.
///
/// # Errors
/// - `RepoError::InvalidEntity` when the table or a column is not a plain
///   identifier, when `COLUMNS` is empty, lists `id`, or repeats a name.
pub fn validate_declaration<E: Entity>() -> RepoResult<()> {
    let invalid = |reason: String| RepoError::InvalidEntity {
        entity: E::NAME,
        reason,
    };

    if !is_valid_identifier(E::TABLE) {
        return Err(invalid(format!("table name `{}` is not an identifier", E::TABLE)));
    }
    if E::COLUMNS.is_empty() {
        return Err(invalid("no columns declared".to_string()));
    }

    let mut seen = HashSet::with_capacity(E::COLUMNS.len());
    for column in E::COLUMNS {
        if !is_valid_identifier(column) {
            return Err(invalid(format!("column `{column}` is not an identifier")));
        }
        if column.eq_ignore_ascii_case(ID_COLUMN) {
            return Err(invalid(format!(
                "`{ID_COLUMN}` is implicit and must not be listed in COLUMNS"
            )));
        }
        if !seen.insert(column.to_ascii_lowercase()) {
            return Err(invalid(format!("column `{column}` is declared twice")));
        }
    }

    Ok(())
}

/// Returns whether `attribute` names a column of `E`, including `id`.
pub fn has_attribute<E: Entity>(attribute: &str) -> bool {
    attribute == ID_COLUMN || E::COLUMNS.contains(&attribute)
}

pub(crate) fn select_sql<E: Entity>() -> String {
    format!(
        "SELECT {ID_COLUMN}, {} FROM {}",
        E::COLUMNS.join(", "),
        E::TABLE
    )
}
