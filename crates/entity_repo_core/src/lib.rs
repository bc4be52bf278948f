//! Generic typed repositories over SQLite.
//! Entities describe their table; repositories provide CRUD and batch
//! operations on top of a caller-supplied session provider.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod session;

pub use config::{ConfigError, ConfigResult, RepositoryConfig};
pub use db::{DatabaseSetup, DbError, DbResult, DbTarget};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig};
pub use model::entity::{Entity, EntityId, ID_COLUMN};
pub use repo::entity_repo::{EntityRepository, SqliteRepository};
pub use repo::error::{RepoError, RepoResult};
pub use repo::ext::RepositoryExt;
pub use repo::log_fields::SensitiveKeys;
pub use repo::query::{FieldValue, Filter, Patch};
pub use session::{ConnectFn, SessionManager, SessionProvider};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
