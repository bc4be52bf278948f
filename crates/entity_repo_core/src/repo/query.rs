//! Attribute filters and patches.
//!
//! # Responsibility
//! - Translate attribute/value pairs into SQL predicates and assignments.
//! - Validate attribute names against the entity declaration before SQL runs.
//!
//! # Invariants
//! - Only declared column names are ever interpolated into SQL text; values
//!   are always bound as parameters.
//! - An empty filter matches every row. An empty `IN` list matches none.

use crate::model::entity::{has_attribute, Entity, EntityId, ID_COLUMN};
use crate::repo::error::{RepoError, RepoResult};
use rusqlite::types::Value;

/// Value bound to a filter predicate or patch assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue(pub Value);

impl FieldValue {
    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self(Value::Text(value.to_string()))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self(Value::Text(value))
    }
}

impl From<&String> for FieldValue {
    fn from(value: &String) -> Self {
        Self(Value::Text(value.clone()))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self(Value::Integer(value))
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self(Value::Integer(i64::from(value)))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self(Value::Integer(i64::from(value)))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self(Value::Integer(i64::from(value)))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self(Value::Real(value))
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        Self(Value::Blob(value))
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self(Value::Null), Into::into)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Eq(String, Value),
    In(String, Vec<Value>),
}

impl Predicate {
    fn attribute(&self) -> &str {
        match self {
            Self::Eq(attribute, _) | Self::In(attribute, _) => attribute,
        }
    }
}

/// Conjunction of attribute predicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches the row with this primary key.
    pub fn by_id(id: EntityId) -> Self {
        Self::new().eq(ID_COLUMN, id)
    }

    /// Matches rows whose primary key is one of `ids`.
    pub fn by_ids(ids: &[EntityId]) -> Self {
        Self::new().is_in(ID_COLUMN, ids.iter().copied())
    }

    /// Adds `attribute = value`; a null value becomes `attribute IS NULL`.
    pub fn eq(mut self, attribute: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.predicates
            .push(Predicate::Eq(attribute.into(), value.into().into_inner()));
        self
    }

    /// Adds `attribute IN (values...)`.
    pub fn is_in<I, V>(mut self, attribute: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        let values = values
            .into_iter()
            .map(|value| value.into().into_inner())
            .collect();
        self.predicates.push(Predicate::In(attribute.into(), values));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// Attribute names in declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.predicates.iter().map(Predicate::attribute)
    }

    /// Rejects attributes that `E` does not declare.
    pub fn validate<E: Entity>(&self) -> RepoResult<()> {
        for attribute in self.attributes() {
            if !has_attribute::<E>(attribute) {
                return Err(RepoError::UnknownAttribute {
                    entity: E::NAME,
                    attribute: attribute.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Builds ` WHERE ...` (or an empty string) plus the values to bind.
    pub(crate) fn to_where_clause(&self) -> (String, Vec<Value>) {
        if self.predicates.is_empty() {
            return (String::new(), Vec::new());
        }

        let mut parts = Vec::with_capacity(self.predicates.len());
        let mut bind_values = Vec::new();
        for predicate in &self.predicates {
            match predicate {
                Predicate::Eq(attribute, Value::Null) => parts.push(format!("{attribute} IS NULL")),
                Predicate::Eq(attribute, value) => {
                    bind_values.push(value.clone());
                    parts.push(format!("{attribute} = ?{}", bind_values.len()));
                }
                Predicate::In(_, values) if values.is_empty() => parts.push("0 = 1".to_string()),
                Predicate::In(attribute, values) => {
                    let mut placeholders = Vec::with_capacity(values.len());
                    for value in values {
                        bind_values.push(value.clone());
                        placeholders.push(format!("?{}", bind_values.len()));
                    }
                    parts.push(format!("{attribute} IN ({})", placeholders.join(", ")));
                }
            }
        }

        (format!(" WHERE {}", parts.join(" AND ")), bind_values)
    }

    /// Number of values `to_where_clause` binds.
    pub(crate) fn bind_count(&self) -> usize {
        self.predicates
            .iter()
            .map(|predicate| match predicate {
                Predicate::Eq(_, Value::Null) => 0,
                Predicate::Eq(_, _) => 1,
                Predicate::In(_, values) => values.len(),
            })
            .sum()
    }

    /// Splits the largest `IN` list so that each part binds at most
    /// `max_binds` values. The union of the parts matches the same rows.
    pub(crate) fn split_for_binds(&self, max_binds: usize) -> Vec<Filter> {
        let total = self.bind_count();
        if total <= max_binds {
            return vec![self.clone()];
        }
        let largest = self
            .predicates
            .iter()
            .enumerate()
            .filter_map(|(index, predicate)| match predicate {
                Predicate::In(attribute, values) => Some((index, attribute, values)),
                Predicate::Eq(_, _) => None,
            })
            .max_by_key(|(_, _, values)| values.len());
        let Some((split_index, attribute, values)) = largest else {
            return vec![self.clone()];
        };

        let chunk_size = max_binds.saturating_sub(total - values.len()).max(1);
        values
            .chunks(chunk_size)
            .map(|chunk| Filter {
                predicates: self
                    .predicates
                    .iter()
                    .enumerate()
                    .map(|(index, predicate)| {
                        if index == split_index {
                            Predicate::In(attribute.clone(), chunk.to_vec())
                        } else {
                            predicate.clone()
                        }
                    })
                    .collect(),
            })
            .collect()
    }

    pub(crate) fn log_pairs(&self) -> Vec<(String, LogValue<'_>)> {
        self.predicates
            .iter()
            .map(|predicate| match predicate {
                Predicate::Eq(attribute, value) => (attribute.clone(), LogValue::One(value)),
                Predicate::In(attribute, values) => (attribute.clone(), LogValue::Many(values)),
            })
            .collect()
    }
}

/// Borrowed value as rendered in log lines.
#[derive(Debug, Clone, Copy)]
pub(crate) enum LogValue<'a> {
    One(&'a Value),
    Many(&'a [Value]),
}

/// Ordered set of attribute assignments for an update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    assignments: Vec<(String, Value)>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `value` to `attribute`. A later assignment to the same
    /// attribute replaces the earlier one.
    pub fn set(mut self, attribute: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        let attribute = attribute.into();
        let value = value.into().into_inner();
        match self
            .assignments
            .iter_mut()
            .find(|(existing, _)| *existing == attribute)
        {
            Some((_, slot)) => *slot = value,
            None => self.assignments.push((attribute, value)),
        }
        self
    }

    /// Assigns only when `value` is `Some`; `None` leaves the column untouched.
    pub fn set_opt<T: Into<FieldValue>>(self, attribute: impl Into<String>, value: Option<T>) -> Self {
        match value {
            Some(value) => self.set(attribute, value),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.assignments.iter().map(|(attribute, _)| attribute.as_str())
    }

    /// Drops every assignment whose attribute is not in `allowed`.
    pub fn restrict_to(mut self, allowed: &[&str]) -> Self {
        self.assignments
            .retain(|(attribute, _)| allowed.contains(&attribute.as_str()));
        self
    }

    /// Rejects unknown attributes and any attempt to overwrite `id`.
    pub fn validate<E: Entity>(&self) -> RepoResult<()> {
        for attribute in self.attributes() {
            if attribute == ID_COLUMN {
                return Err(RepoError::ImmutableAttribute {
                    entity: E::NAME,
                    attribute: attribute.to_string(),
                });
            }
            if !has_attribute::<E>(attribute) {
                return Err(RepoError::UnknownAttribute {
                    entity: E::NAME,
                    attribute: attribute.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Builds `a = ?1, b = ?2` plus the values to bind, in assignment order.
    pub(crate) fn to_set_clause(&self) -> (String, Vec<Value>) {
        let mut parts = Vec::with_capacity(self.assignments.len());
        let mut bind_values = Vec::with_capacity(self.assignments.len());
        for (attribute, value) in &self.assignments {
            bind_values.push(value.clone());
            parts.push(format!("{attribute} = ?{}", bind_values.len()));
        }
        (parts.join(", "), bind_values)
    }

    pub(crate) fn log_pairs(&self) -> Vec<(String, LogValue<'_>)> {
        self.assignments
            .iter()
            .map(|(attribute, value)| (attribute.clone(), LogValue::One(value)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldValue, Filter, Patch};
    use rusqlite::types::Value;

    #[test]
    fn empty_filter_has_no_where_clause() {
        let (sql, values) = Filter::new().to_where_clause();
        assert!(sql.is_empty());
        assert!(values.is_empty());
    }

    #[test]
    fn filter_numbers_placeholders_across_predicates() {
        let filter = Filter::new()
            .eq("name", "Fido")
            .is_in("id", [3_i64, 5])
            .eq("age", 4_i64);
        let (sql, values) = filter.to_where_clause();
        assert_eq!(sql, " WHERE name = ?1 AND id IN (?2, ?3) AND age = ?4");
        assert_eq!(
            values,
            vec![
                Value::Text("Fido".to_string()),
                Value::Integer(3),
                Value::Integer(5),
                Value::Integer(4),
            ]
        );
    }

    #[test]
    fn null_equality_and_empty_in_list_translate_to_constant_predicates() {
        let filter = Filter::new()
            .eq("nickname", None::<String>)
            .is_in("id", Vec::<i64>::new());
        let (sql, values) = filter.to_where_clause();
        assert_eq!(sql, " WHERE nickname IS NULL AND 0 = 1");
        assert!(values.is_empty());
    }

    #[test]
    fn patch_skips_none_and_keeps_last_assignment() {
        let patch = Patch::new()
            .set("name", "first")
            .set_opt("age", None::<i64>)
            .set("name", "second")
            .set_opt("age", Some(7_i64));
        let (sql, values) = patch.to_set_clause();
        assert_eq!(sql, "name = ?1, age = ?2");
        assert_eq!(
            values,
            vec![Value::Text("second".to_string()), Value::Integer(7)]
        );
    }

    #[test]
    fn oversized_in_list_is_split_into_bounded_parts() {
        let filter = Filter::new().eq("age", 3_i64).is_in("id", 1_i64..=10);
        assert_eq!(filter.bind_count(), 11);
        assert_eq!(filter.split_for_binds(11), vec![filter.clone()]);

        let parts = filter.split_for_binds(5);
        assert_eq!(parts.len(), 3);
        for part in &parts {
            assert!(part.bind_count() <= 5);
            let (sql, _) = part.to_where_clause();
            assert!(sql.starts_with(" WHERE age = ?1 AND id IN (?2"));
        }
        let (_, last_values) = parts[2].to_where_clause();
        assert_eq!(
            last_values,
            vec![Value::Integer(3), Value::Integer(9), Value::Integer(10)]
        );
    }

    #[test]
    fn filter_without_in_list_is_never_split() {
        let filter = Filter::new().eq("name", "a").eq("age", 1_i64);
        assert_eq!(filter.split_for_binds(1), vec![filter]);
    }

    #[test]
    fn restrict_to_keeps_only_allowed_assignments() {
        let patch = Patch::new()
            .set("name", "Rex")
            .set("age", 4_i64)
            .set("id", 9_i64)
            .restrict_to(&["name"]);
        let (sql, values) = patch.to_set_clause();
        assert_eq!(sql, "name = ?1");
        assert_eq!(values, vec![Value::Text("Rex".to_string())]);
    }

    #[test]
    fn field_value_conversions_map_to_sqlite_types() {
        assert_eq!(FieldValue::from(true).into_inner(), Value::Integer(1));
        assert_eq!(FieldValue::from(1.5_f64).into_inner(), Value::Real(1.5));
        assert_eq!(FieldValue::from(Some(2_i32)).into_inner(), Value::Integer(2));
        assert_eq!(FieldValue::from(None::<&str>).into_inner(), Value::Null);
    }
}
