//! Rendering of entity attributes and call arguments into log fields.
//!
//! # Invariants
//! - Values of sensitive attributes never reach the rendered output.
//! - Rendering is infallible and bounded in length per value.

use crate::logging::sanitize_message;
use crate::model::entity::{Entity, ID_COLUMN};
use crate::repo::query::LogValue;
use rusqlite::types::Value;
use std::collections::BTreeSet;
use std::fmt::Write;

const MAX_LOG_VALUE_CHARS: usize = 64;
const MAX_LOG_LIST_ITEMS: usize = 8;

/// Attribute names whose values are withheld from logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensitiveKeys {
    keys: BTreeSet<String>,
}

impl SensitiveKeys {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, attribute: &str) -> bool {
        self.keys.contains(attribute)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Renders ` id=.. attr=..` for one entity, skipping sensitive attributes.
pub(crate) fn entity_fields<E: Entity>(entity: &E, sensitive: &SensitiveKeys) -> String {
    let mut out = String::new();
    match entity.id() {
        Some(id) => {
            let _ = write!(out, " {ID_COLUMN}={id}");
        }
        None => {
            let _ = write!(out, " {ID_COLUMN}=none");
        }
    }
    for (attribute, value) in entity.values() {
        if sensitive.contains(attribute) {
            continue;
        }
        let _ = write!(out, " {attribute}={}", render_value(&value));
    }
    out
}

/// Renders ` kwarg_attr=..` pairs for filter/patch arguments.
pub(crate) fn kwarg_fields(pairs: &[(String, LogValue<'_>)], sensitive: &SensitiveKeys) -> String {
    let mut out = String::new();
    for (attribute, value) in pairs {
        let rendered = if sensitive.contains(attribute) {
            "<redacted>".to_string()
        } else {
            match value {
                LogValue::One(value) => render_value(value),
                LogValue::Many(values) => render_list(values),
            }
        };
        let _ = write!(out, " kwarg_{}={rendered}", sanitize_message(attribute, MAX_LOG_VALUE_CHARS));
    }
    out
}

pub(crate) fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Integer(number) => number.to_string(),
        Value::Real(number) => number.to_string(),
        Value::Text(text) => format!("{:?}", sanitize_message(text, MAX_LOG_VALUE_CHARS)),
        Value::Blob(bytes) => format!("<blob:{}B>", bytes.len()),
    }
}

fn render_list(values: &[Value]) -> String {
    let mut items: Vec<String> = values
        .iter()
        .take(MAX_LOG_LIST_ITEMS)
        .map(render_value)
        .collect();
    if values.len() > MAX_LOG_LIST_ITEMS {
        items.push(format!("...+{}", values.len() - MAX_LOG_LIST_ITEMS));
    }
    format!("[{}]", items.join(","))
}

#[cfg(test)]
mod tests {
    use super::{entity_fields, kwarg_fields, render_value, SensitiveKeys};
    use crate::model::entity::Entity;
    use crate::repo::error::RepoResult;
    use crate::repo::query::{Filter, Patch};
    use rusqlite::types::Value;
    use rusqlite::Row;

    struct Account {
        id: Option<i64>,
        login: String,
        password: String,
    }

    impl Entity for Account {
        const NAME: &'static str = "Account";
        const TABLE: &'static str = "account";
        const COLUMNS: &'static [&'static str] = &["login", "password"];

        fn id(&self) -> Option<i64> {
            self.id
        }

        fn values(&self) -> Vec<(&'static str, Value)> {
            vec![
                ("login", Value::Text(self.login.clone())),
                ("password", Value::Text(self.password.clone())),
            ]
        }

        fn from_row(row: &Row<'_>) -> RepoResult<Self> {
            Ok(Self {
                id: row.get("id")?,
                login: row.get("login")?,
                password: row.get("password")?,
            })
        }
    }

    fn account() -> Account {
        Account {
            id: Some(1),
            login: "admin".to_string(),
            password: "hunter2".to_string(),
        }
    }

    #[test]
    fn entity_fields_include_all_attributes_without_sensitive_keys() {
        let rendered = entity_fields(&account(), &SensitiveKeys::default());
        assert_eq!(rendered, r#" id=1 login="admin" password="hunter2""#);
    }

    #[test]
    fn entity_fields_omit_sensitive_attributes() {
        let rendered = entity_fields(&account(), &SensitiveKeys::new(["password"]));
        assert_eq!(rendered, r#" id=1 login="admin""#);
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn kwarg_fields_prefix_and_redact() {
        let sensitive = SensitiveKeys::new(["password"]);
        let patch = Patch::new().set("login", "root").set("password", "secret");
        let rendered = kwarg_fields(&patch.log_pairs(), &sensitive);
        assert_eq!(rendered, r#" kwarg_login="root" kwarg_password=<redacted>"#);

        let filter = Filter::by_ids(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        let rendered = kwarg_fields(&filter.log_pairs(), &sensitive);
        assert_eq!(rendered, " kwarg_id=[1,2,3,4,5,6,7,8,...+2]");
    }

    #[test]
    fn text_values_are_sanitized() {
        let rendered = render_value(&Value::Text("line1\nline2".to_string()));
        assert_eq!(rendered, r#""line1 line2""#);
        assert_eq!(render_value(&Value::Blob(vec![0; 4])), "<blob:4B>");
        assert_eq!(render_value(&Value::Null), "null");
    }
}
