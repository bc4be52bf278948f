//! Database URL resolution.

use super::{DbError, DbResult};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;

/// Where a session's connection lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbTarget {
    Memory,
    File(PathBuf),
}

impl DbTarget {
    /// Parses `:memory:`, `sqlite::memory:`, `sqlite://<path>`, `sqlite:<path>`
    /// or a bare filesystem path.
    pub fn parse(url: &str) -> DbResult<Self> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(DbError::InvalidTarget(url.to_string()));
        }

        let rest = trimmed
            .strip_prefix("sqlite://")
            .or_else(|| trimmed.strip_prefix("sqlite:"))
            .unwrap_or(trimmed);

        if rest == ":memory:" {
            return Ok(Self::Memory);
        }
        if rest.is_empty() || rest.contains("://") {
            return Err(DbError::InvalidTarget(url.to_string()));
        }

        Ok(Self::File(PathBuf::from(rest)))
    }

    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

impl FromStr for DbTarget {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for DbTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "sqlite::memory:"),
            Self::File(path) => write!(f, "sqlite://{}", path.display()),
        }
    }
}
