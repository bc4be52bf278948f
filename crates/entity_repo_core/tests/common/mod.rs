#![allow(dead_code)]

use entity_repo_core::{
    DatabaseSetup, DbTarget, Entity, EntityId, FieldValue, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{Connection, Row};

pub const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS shelter (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL
    );",
    "CREATE TABLE IF NOT EXISTS pet (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        age INTEGER NOT NULL,
        type TEXT NOT NULL CHECK (type IN ('dog', 'cat', 'fish')),
        shelter_id INTEGER NOT NULL REFERENCES shelter(id) ON DELETE CASCADE
    );",
    "CREATE TABLE IF NOT EXISTS account (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        login TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL
    );",
    "CREATE TABLE IF NOT EXISTS tag (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        label TEXT NOT NULL DEFAULT 'untitled'
    );",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PetType {
    Dog,
    Cat,
    Fish,
}

impl PetType {
    fn as_db(self) -> &'static str {
        match self {
            Self::Dog => "dog",
            Self::Cat => "cat",
            Self::Fish => "fish",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "dog" => Some(Self::Dog),
            "cat" => Some(Self::Cat),
            "fish" => Some(Self::Fish),
            _ => None,
        }
    }
}

impl From<PetType> for FieldValue {
    fn from(value: PetType) -> Self {
        FieldValue(Value::Text(value.as_db().to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shelter {
    pub id: Option<EntityId>,
    pub name: String,
}

impl Shelter {
    pub fn new(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
        }
    }
}

impl Entity for Shelter {
    const NAME: &'static str = "Shelter";
    const TABLE: &'static str = "shelter";
    const COLUMNS: &'static [&'static str] = &["name"];

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![("name", Value::Text(self.name.clone()))]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pet {
    pub id: Option<EntityId>,
    pub name: String,
    pub age: i64,
    pub kind: PetType,
    pub shelter_id: EntityId,
}

impl Pet {
    pub fn new(name: &str, age: i64, kind: PetType, shelter_id: EntityId) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            age,
            kind,
            shelter_id,
        }
    }
}

impl Entity for Pet {
    const NAME: &'static str = "Pet";
    const TABLE: &'static str = "pet";
    const COLUMNS: &'static [&'static str] = &["name", "age", "type", "shelter_id"];

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", Value::Text(self.name.clone())),
            ("age", Value::Integer(self.age)),
            ("type", Value::Text(self.kind.as_db().to_string())),
            ("shelter_id", Value::Integer(self.shelter_id)),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let type_text: String = row.get("type")?;
        let kind = PetType::parse(&type_text).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid pet type `{type_text}` in pet.type"))
        })?;
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            age: row.get("age")?,
            kind,
            shelter_id: row.get("shelter_id")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: Option<EntityId>,
    pub login: String,
    pub password: String,
}

impl Entity for Account {
    const NAME: &'static str = "Account";
    const TABLE: &'static str = "account";
    const COLUMNS: &'static [&'static str] = &["login", "password"];

    fn id(&self) -> Option<EntityId> {
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

/// Unset fields are left out of `values` so column defaults apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: Option<EntityId>,
    pub label: Option<String>,
}

impl Entity for Tag {
    const NAME: &'static str = "Tag";
    const TABLE: &'static str = "tag";
    const COLUMNS: &'static [&'static str] = &["label"];

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        self.label
            .iter()
            .map(|label| ("label", Value::Text(label.clone())))
            .collect()
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            label: row.get("label")?,
        })
    }
}

pub fn setup() -> DatabaseSetup {
    DatabaseSetup::new(DbTarget::Memory, SCHEMA.iter().copied())
}

/// Fresh in-memory database with the pet/shelter schema applied.
pub fn open_scenario_db() -> Connection {
    setup().create_database().unwrap()
}

pub fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}
