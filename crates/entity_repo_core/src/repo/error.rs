//! Repository error type.

use crate::db::DbError;
use crate::model::entity::EntityId;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Semantic and transport errors raised by repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// No row with this id exists.
    NotFound { entity: &'static str, id: EntityId },
    /// The operation needs a persisted entity but `id()` is `None`.
    MissingId { entity: &'static str },
    /// Insert failed; the underlying cause is kept as source.
    CouldNotCreate {
        entity: &'static str,
        source: Box<RepoError>,
    },
    /// Delete failed; the underlying cause is kept as source.
    CouldNotDelete {
        entity: &'static str,
        source: Box<RepoError>,
    },
    /// A filter or patch names an attribute the entity does not declare.
    UnknownAttribute {
        entity: &'static str,
        attribute: String,
    },
    /// A patch tries to overwrite the primary key.
    ImmutableAttribute {
        entity: &'static str,
        attribute: String,
    },
    /// The entity declaration cannot be mapped onto SQL.
    InvalidEntity {
        entity: &'static str,
        reason: String,
    },
    /// A stored row cannot be decoded into the entity.
    InvalidData(String),
    Db(DbError),
}

impl RepoError {
    pub(crate) fn could_not_create(entity: &'static str, source: RepoError) -> Self {
        Self::CouldNotCreate {
            entity,
            source: Box::new(source),
        }
    }

    pub(crate) fn could_not_delete(entity: &'static str, source: RepoError) -> Self {
        Self::CouldNotDelete {
            entity,
            source: Box::new(source),
        }
    }

    /// Stable machine-readable code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "entity_not_found",
            Self::MissingId { .. } => "entity_missing_id",
            Self::CouldNotCreate { .. } => "could_not_create",
            Self::CouldNotDelete { .. } => "could_not_delete",
            Self::UnknownAttribute { .. } => "unknown_attribute",
            Self::ImmutableAttribute { .. } => "immutable_attribute",
            Self::InvalidEntity { .. } => "invalid_entity",
            Self::InvalidData(_) => "invalid_data",
            Self::Db(_) => "db_error",
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, id } => write!(f, "entity {entity} with id {id} not found"),
            Self::MissingId { entity } => write!(f, "entity {entity} has not been persisted yet"),
            Self::CouldNotCreate { entity, source } => {
                write!(f, "could not create entity {entity}: {source}")
            }
            Self::CouldNotDelete { entity, source } => {
                write!(f, "could not delete entity {entity}: {source}")
            }
            Self::UnknownAttribute { entity, attribute } => {
                write!(f, "entity {entity} does not possess attribute `{attribute}`")
            }
            Self::ImmutableAttribute { entity, attribute } => {
                write!(f, "attribute `{attribute}` of entity {entity} cannot be updated")
            }
            Self::InvalidEntity { entity, reason } => {
                write!(f, "invalid entity declaration for {entity}: {reason}")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CouldNotCreate { source, .. } | Self::CouldNotDelete { source, .. } => {
                Some(source.as_ref())
            }
            Self::Db(err) => Some(err),
            Self::NotFound { .. }
            | Self::MissingId { .. }
            | Self::UnknownAttribute { .. }
            | Self::ImmutableAttribute { .. }
            | Self::InvalidEntity { .. }
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
