//! Connection-owning session provider.

use super::{run_in_transaction, SessionProvider};
use crate::config::RepositoryConfig;
use crate::db::{open_target, DbResult, DbTarget};
use crate::repo::error::RepoResult;
use rusqlite::Connection;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Owns one connection and serializes sessions over it.
///
/// Safe to share between threads; concurrent sessions wait for each other.
#[derive(Debug)]
pub struct SessionManager {
    target: DbTarget,
    conn: Mutex<Connection>,
}

impl SessionManager {
    /// Opens `target` and keeps the connection for all later sessions.
    pub fn open(target: DbTarget, busy_timeout: Duration) -> DbResult<Self> {
        let conn = open_target(&target, busy_timeout)?;
        Ok(Self {
            target,
            conn: Mutex::new(conn),
        })
    }

    pub fn from_config(config: &RepositoryConfig) -> DbResult<Self> {
        let target = config.database_target()?;
        Self::open(target, config.busy_timeout())
    }

    /// Wraps an already configured connection.
    pub fn from_connection(target: DbTarget, conn: Connection) -> Self {
        Self {
            target,
            conn: Mutex::new(conn),
        }
    }

    pub fn target(&self) -> &DbTarget {
        &self.target
    }

    /// Consumes the manager and returns its connection.
    pub fn into_connection(self) -> Connection {
        self.conn
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionProvider for SessionManager {
    fn with_session<T, F>(&self, work: F) -> RepoResult<T>
    where
        F: FnOnce(&Connection) -> RepoResult<T>,
    {
        // Transactions of panicked sessions roll back on drop.
        let mut conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = conn.transaction()?;
        run_in_transaction(tx, "manager", work)
    }
}
