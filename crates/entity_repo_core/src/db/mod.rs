//! SQLite connection bootstrap and database setup helpers.
//!
//! # Responsibility
//! - Open and configure SQLite connections used by sessions.
//! - Resolve database URLs into concrete file or in-memory targets.
//! - Create/drop databases from caller-supplied DDL.
//!
//! # Invariants
//! - Every connection handed to a session has `foreign_keys=ON`.
//! - Table definitions are owned by the caller; this module never invents schema.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;
mod setup;
mod target;

pub use open::{open_db, open_db_in_memory, open_target, DEFAULT_BUSY_TIMEOUT};
pub use setup::DatabaseSetup;
pub use target::DbTarget;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    Io(std::io::Error),
    InvalidTarget(String),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::InvalidTarget(url) => write!(f, "unsupported database url `{url}`"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::InvalidTarget(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<std::io::Error> for DbError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
