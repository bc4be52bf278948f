//! Database creation and teardown from caller-owned DDL.
//!
//! # Invariants
//! - `create_database` never drops existing data; statements are expected to
//!   be idempotent (`CREATE TABLE IF NOT EXISTS ...`).
//! - All statements of one `create_database` call apply atomically.

use super::{open_target, DbResult, DbTarget, DEFAULT_BUSY_TIMEOUT};
use log::{info, warn};
use rusqlite::Connection;

/// Creates a database and its tables from a list of DDL statements.
#[derive(Debug, Clone)]
pub struct DatabaseSetup {
    target: DbTarget,
    statements: Vec<String>,
}

impl DatabaseSetup {
    pub fn new<I, S>(target: DbTarget, statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            target,
            statements: statements.into_iter().map(Into::into).collect(),
        }
    }

    pub fn target(&self) -> &DbTarget {
        &self.target
    }

    /// Returns whether the backing file exists. In-memory targets always exist.
    pub fn database_exists(&self) -> bool {
        match &self.target {
            DbTarget::Memory => true,
            DbTarget::File(path) => path.is_file(),
        }
    }

    /// Opens the target and applies all DDL statements in one transaction.
    ///
    /// Returns the bootstrapped connection so in-memory callers keep their data.
    pub fn create_database(&self) -> DbResult<Connection> {
        let mut conn = open_target(&self.target, DEFAULT_BUSY_TIMEOUT)?;
        self.create_tables(&mut conn)?;
        info!(
            "event=db_setup module=db status=ok target={} statements={}",
            self.target,
            self.statements.len()
        );
        Ok(conn)
    }

    /// Applies all DDL statements on an already opened connection.
    pub fn create_tables(&self, conn: &mut Connection) -> DbResult<()> {
        let tx = conn.transaction()?;
        for statement in &self.statements {
            tx.execute_batch(statement)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Removes the database file if present. In-memory targets are a no-op.
    pub fn drop_database(&self) -> DbResult<()> {
        let DbTarget::File(path) = &self.target else {
            return Ok(());
        };
        if !path.exists() {
            return Ok(());
        }

        if let Err(err) = std::fs::remove_file(path) {
            warn!(
                "event=db_drop module=db status=error target={} error={}",
                self.target, err
            );
            return Err(err.into());
        }
        info!("event=db_drop module=db status=ok target={}", self.target);
        Ok(())
    }
}
